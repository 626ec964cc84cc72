//! Turning human-readable schema names into Rust identifiers.

/// Keywords that cannot even be raw identifiers.
const PATH_KEYWORDS: &[&str] = &["crate", "self", "super"];

/// Rust keywords that need the raw-identifier form when used as field names.
const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "do", "dyn", "else",
    "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop",
    "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static",
    "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual",
    "where", "while", "yield",
];

/// Replaces separators with `_`, drops punctuation, and makes sure the result
/// does not start with a digit.
pub fn safe_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);

    for c in name.chars() {
        match c {
            ' ' | '/' | '-' => out.push('_'),
            '[' | ']' | '(' | ')' | ':' | '.' | ',' | '=' | '>' | '#' | '&' | '*' | '"' | '+'
            | '\'' => {}
            _ => out.push(c),
        }
    }

    if !out.chars().next().is_some_and(char::is_alphabetic) {
        out.insert(0, '_');
    }

    out
}

/// Struct field identifier: lower-case, raw when it collides with a keyword.
pub fn field_ident(name: &str) -> String {
    let ident = safe_name(name).to_lowercase();
    if KEYWORDS.contains(&ident.as_str()) {
        format!("r#{ident}")
    } else if PATH_KEYWORDS.contains(&ident.as_str()) {
        format!("{ident}_")
    } else {
        ident
    }
}

/// Type identifier in CamelCase, e.g. `Blend Equation` -> `BlendEquation`.
pub fn type_ident(name: &str) -> String {
    let safe = safe_name(name);
    let mut out = String::with_capacity(safe.len());

    for part in safe.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }

    if !out.chars().next().is_some_and(char::is_alphabetic) {
        out.insert(0, '_');
    }

    out
}

/// Upper-case constant name, `PREFIX_NAME` or just `NAME` without a prefix.
pub fn prefixed_upper(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => safe_name(&format!("{prefix}_{name}")).to_uppercase(),
        None => safe_name(name).to_uppercase(),
    }
}

/// Constant naming one member of an enum.
///
/// The enum's own prefix wins; otherwise the global prefix and the enum name are
/// used, which gives the `<prefix>_<enum>_<member>` form defaults refer to.
pub fn enum_member(
    global_prefix: &str,
    enum_name: &str,
    enum_prefix: Option<&str>,
    member: &str,
) -> String {
    match enum_prefix {
        Some(prefix) => prefixed_upper(Some(prefix), member),
        None => prefixed_upper(Some(&format!("{global_prefix}_{enum_name}")), member),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name() {
        assert_eq!(safe_name("Blend Equation"), "Blend_Equation");
        assert_eq!(safe_name("R/W (cached)"), "R_W_cached");
        assert_eq!(safe_name("3D"), "_3D");
        assert_eq!(safe_name(""), "_");
    }

    #[test]
    fn test_field_ident() {
        assert_eq!(field_ident("Shader Program"), "shader_program");
        assert_eq!(field_ident("Type"), "r#type");
        assert_eq!(field_ident("Gen"), "r#gen");
        assert_eq!(field_ident("Self"), "self_");
    }

    #[test]
    fn test_type_ident() {
        assert_eq!(type_ident("Blend Equation"), "BlendEquation");
        assert_eq!(type_ident("RT Buffer"), "RTBuffer");
        assert_eq!(type_ident("attribute buffer"), "AttributeBuffer");
        assert_eq!(type_ident("3D Texture"), "_3DTexture");
    }

    #[test]
    fn test_enum_member() {
        assert_eq!(enum_member("mali", "Color", None, "Red"), "MALI_COLOR_RED");
        assert_eq!(enum_member("mali", "Color", Some("rgb"), "Red"), "RGB_RED");
        assert_eq!(enum_member("mali", "Func", None, "Not Equal"), "MALI_FUNC_NOT_EQUAL");
    }

    #[test]
    fn test_prefixed_upper() {
        assert_eq!(prefixed_upper(Some("Mode"), "fast"), "MODE_FAST");
        assert_eq!(prefixed_upper(None, "fast"), "FAST");
    }
}
