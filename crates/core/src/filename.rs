/// Normalize a user-supplied name into a header-safe slug.
///
/// Control characters, quotes, semicolons and tabs are dropped, common Latin
/// accented letters are folded to ASCII, `@` becomes the word `at`, and every
/// run of other characters collapses into a single `-`. The result is
/// lowercase ASCII, never empty, and never starts or ends with `-`.
pub fn sanitize_filename(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut separator = false;

    for ch in name.chars() {
        if matches!(ch, '\r' | '\n' | '\t' | '"' | '\'' | ';') || ch.is_control() {
            continue;
        }
        if ch == '@' {
            separator = true;
            push_segment(&mut slug, "at", &mut separator);
            separator = true;
        } else if ch.is_ascii_alphanumeric() {
            let mut buf = [0u8; 4];
            push_segment(
                &mut slug,
                ch.to_ascii_lowercase().encode_utf8(&mut buf),
                &mut separator,
            );
        } else if let Some(ascii) = fold_latin(ch) {
            push_segment(&mut slug, ascii, &mut separator);
        } else {
            separator = true;
        }
    }

    if slug.is_empty() {
        "file".to_owned()
    } else {
        slug
    }
}

fn push_segment(slug: &mut String, segment: &str, separator: &mut bool) {
    if *separator && !slug.is_empty() {
        slug.push('-');
    }
    *separator = false;
    slug.push_str(segment);
}

/// Lowercase ASCII spelling of common accented Latin letters.
fn fold_latin(ch: char) -> Option<&'static str> {
    let ascii = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä'
        | 'Å' | 'Ā' | 'Ă' | 'Ą' => "a",
        'æ' | 'Æ' => "ae",
        'ç' | 'ć' | 'č' | 'Ç' | 'Ć' | 'Č' => "c",
        'ď' | 'đ' | 'Ď' | 'Đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' | 'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ė'
        | 'Ę' | 'Ě' => "e",
        'ğ' | 'Ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' | 'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' | 'Į' | 'İ' => {
            "i"
        }
        'ł' | 'ľ' | 'Ł' | 'Ľ' => "l",
        'ñ' | 'ń' | 'ň' | 'Ñ' | 'Ń' | 'Ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø'
        | 'Ō' | 'Ő' => "o",
        'œ' | 'Œ' => "oe",
        'ř' | 'Ř' => "r",
        'ś' | 'š' | 'ş' | 'Ś' | 'Š' | 'Ş' => "s",
        'ß' => "ss",
        'ť' | 'ţ' | 'Ť' | 'Ţ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' | 'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů'
        | 'Ű' | 'Ų' => "u",
        'ý' | 'ÿ' | 'Ý' | 'Ÿ' => "y",
        'ž' | 'ź' | 'ż' | 'Ž' | 'Ź' | 'Ż' => "z",
        _ => return None,
    };
    Some(ascii)
}
