//! Tag classification tables. All lookups expect ASCII-lowercase names.

/// Tags eligible for speech by tag alone: prose, headings, list items,
/// links, table cells, inline emphasis, form controls, captions,
/// quotations and landmark/sectioning elements.
pub fn is_speakable(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "li"
            | "dt"
            | "dd"
            | "a"
            | "th"
            | "td"
            | "caption"
            | "figcaption"
            | "blockquote"
            | "q"
            | "code"
            | "pre"
            | "strong"
            | "em"
            | "b"
            | "i"
            | "mark"
            | "abbr"
            | "cite"
            | "time"
            | "label"
            | "button"
            | "input"
            | "textarea"
            | "select"
            | "option"
            | "legend"
            | "summary"
            | "output"
            | "nav"
            | "main"
            | "header"
            | "footer"
            | "article"
            | "section"
            | "aside"
            | "address"
    )
}

/// Inline wrappers that do not stop a parent from being read as one piece
/// of text.
pub fn is_inline(tag: &str) -> bool {
    matches!(
        tag,
        "a" | "abbr"
            | "b"
            | "bdi"
            | "bdo"
            | "br"
            | "cite"
            | "code"
            | "data"
            | "del"
            | "dfn"
            | "em"
            | "i"
            | "ins"
            | "kbd"
            | "mark"
            | "q"
            | "s"
            | "samp"
            | "small"
            | "span"
            | "strong"
            | "sub"
            | "sup"
            | "time"
            | "u"
            | "var"
            | "wbr"
    )
}

/// Vector-graphics containers and primitives. Never speakable.
pub fn is_vector_graphics(tag: &str) -> bool {
    matches!(
        tag,
        "svg"
            | "g"
            | "path"
            | "circle"
            | "ellipse"
            | "line"
            | "polyline"
            | "polygon"
            | "rect"
            | "use"
            | "defs"
            | "symbol"
            | "clippath"
            | "mask"
            | "lineargradient"
            | "radialgradient"
            | "stop"
    )
}

/// Elements that render no text of their own: vector graphics, images and
/// line-break hints. They never make a parent's text complex.
pub fn is_textless(tag: &str) -> bool {
    is_vector_graphics(tag) || matches!(tag, "img" | "picture" | "br" | "wbr" | "hr")
}

/// `<input>` types rendered as push buttons, labelled by their `value`.
pub fn is_button_input(tag: &str, input_type: Option<&str>) -> bool {
    tag == "input"
        && input_type.is_some_and(|t| {
            ["submit", "button", "reset"]
                .iter()
                .any(|k| t.trim().eq_ignore_ascii_case(k))
        })
}

/// Controls whose content is a typed value. `input_type` is the `type`
/// attribute of an `<input>`, if any.
pub fn is_text_input(tag: &str, input_type: Option<&str>) -> bool {
    match tag {
        "textarea" => true,
        "input" => {
            let kind = input_type.map(str::trim).unwrap_or("text");
            ["text", "search", "email", "url", "tel", "password", "number"]
                .iter()
                .any(|k| kind.eq_ignore_ascii_case(k))
                || kind.is_empty()
        }
        _ => false,
    }
}
