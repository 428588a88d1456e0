use std::borrow::Cow;

/// Longest reference we recognize is `&hellip;` (8 bytes including `&` and `;`),
/// but numeric references like `&#128169;` can be a little longer.
const MAX_REFERENCE_LEN: usize = 12;

/// Decodes HTML/XML character references in free text.
///
/// Handles the named entities that show up in real-world feeds plus numeric
/// decimal (`&#NNN;`) and hex (`&#xHHHH;`, case-insensitive) forms.
/// Unrecognized references are left untouched — no error, no partial
/// consumption — so `&unknown;` and a bare `&` both survive verbatim.
/// Adjacent entities resolve independently in a single pass; the output is
/// never re-scanned, so decoding cannot cascade.
///
/// Returns `Cow::Borrowed` when the input contains no `&` (common case).
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'&' {
            // Batch-copy the run of ordinary bytes up to the next ampersand
            let start = i;
            while i < bytes.len() && bytes[i] != b'&' {
                i += 1;
            }
            out.push_str(&s[start..i]);
            continue;
        }

        // Look for a terminating ';' within the reference length bound
        let end = bytes[i + 1..]
            .iter()
            .take(MAX_REFERENCE_LEN)
            .position(|&b| b == b';')
            .map(|p| i + 1 + p);

        match end {
            Some(end) => match resolve_reference(&s[i + 1..end]) {
                Some(c) => {
                    out.push(c);
                    i = end + 1;
                }
                None => {
                    // Unrecognized reference: emit the '&' literally and keep
                    // scanning from the next byte so later references still resolve
                    out.push('&');
                    i += 1;
                }
            },
            None => {
                out.push('&');
                i += 1;
            }
        }
    }

    Cow::Owned(out)
}

/// Resolves the body of a reference (the text between `&` and `;`).
fn resolve_reference(body: &str) -> Option<char> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = if let Some(hex) = numeric.strip_prefix(['x', 'X']) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            numeric.parse::<u32>().ok()?
        };
        return char::from_u32(code);
    }

    let c = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "hellip" => '…',
        "nbsp" => '\u{a0}',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "laquo" => '«',
        "raquo" => '»',
        "middot" => '·',
        _ => return None,
    };
    Some(c)
}
