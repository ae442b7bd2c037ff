// Shared helpers

/// Replacement used for the hidden part of a token
pub const TOKEN_MASK: &str = "****";

/// Mask a token for logging
///
/// Tokens longer than four characters keep their first and last two
/// characters; anything shorter is replaced entirely.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return TOKEN_MASK.to_string();
    }

    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}{}{}", head, TOKEN_MASK, tail)
}

/// Percent-encode a value for use as a single URL path segment
pub fn encode_path_segment(segment: &str) -> String {
    use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

    // Everything except RFC 3986 unreserved characters
    const SEGMENT: &AsciiSet = &CONTROLS
        .add(b' ')
        .add(b'"')
        .add(b'#')
        .add(b'%')
        .add(b'/')
        .add(b'<')
        .add(b'>')
        .add(b'?')
        .add(b'`')
        .add(b'{')
        .add(b'}')
        .add(b'\\')
        .add(b'^')
        .add(b'|')
        .add(b'[')
        .add(b']')
        .add(b'@')
        .add(b':')
        .add(b';')
        .add(b'=')
        .add(b'&')
        .add(b'+')
        .add(b'$')
        .add(b',');

    utf8_percent_encode(segment, SEGMENT).to_string()
}
