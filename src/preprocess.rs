//! Comment stripping and escaping of brackets inside literals

/// The six structural bracket characters, in sentinel order.
pub const BRACKETS: [char; 6] = ['(', ')', '[', ']', '{', '}'];

/// First code point of the private block used to hide brackets. Code points
/// `U+FDD0..U+FDD6` stand for the brackets in [`BRACKETS`] order.
const SENTINEL_BASE: u32 = 0xFDD0;

/// Sentinel standing in for `bracket`, or `None` if it is not a bracket.
pub fn hide(bracket: char) -> Option<char> {
    BRACKETS
        .iter()
        .position(|&b| b == bracket)
        .and_then(|i| char::from_u32(SENTINEL_BASE + i as u32))
}

/// The bracket a sentinel stands for, any other character unchanged.
pub fn reveal(c: char) -> char {
    let code = c as u32;
    if (SENTINEL_BASE..SENTINEL_BASE + BRACKETS.len() as u32).contains(&code) {
        BRACKETS[(code - SENTINEL_BASE) as usize]
    } else {
        c
    }
}

/// Removes `#` line comments and hides brackets that appear inside string
/// literals or right after a `'`.
pub fn preprocess(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut result = String::with_capacity(source.len());
    let mut in_string = false;
    let mut cursor = 0;

    while cursor < chars.len() {
        let c = chars[cursor];
        if in_string {
            if let Some(sentinel) = hide(c) {
                result.push(sentinel);
            } else {
                if c == '"' {
                    // only the single preceding character is checked
                    in_string = cursor > 0 && chars[cursor - 1] == '\\';
                }
                result.push(c);
            }
            cursor += 1;
            continue;
        }

        match c {
            '#' => {
                while cursor < chars.len() && chars[cursor] != '\n' {
                    cursor += 1;
                }
            }
            '"' => {
                in_string = true;
                result.push(c);
                cursor += 1;
            }
            '\'' if cursor + 1 < chars.len() => {
                let next = chars[cursor + 1];
                result.push(c);
                result.push(hide(next).unwrap_or(next));
                cursor += 2;
            }
            _ => {
                result.push(c);
                cursor += 1;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentinel(bracket: char) -> char {
        hide(bracket).unwrap()
    }

    #[test]
    fn strips_comments() {
        assert_eq!(preprocess("12+ # add them\nu # print"), "12+ \nu ");
        assert_eq!(preprocess("#only a comment"), "");
    }

    #[test]
    fn hash_inside_string_is_kept() {
        assert_eq!(preprocess("\"a#b\"o"), "\"a#b\"o");
    }

    #[test]
    fn hides_brackets_in_strings() {
        let expected: String = ['"', sentinel('['), 'x', sentinel(')'), '"', '['].iter().collect();
        assert_eq!(preprocess("\"[x)\"["), expected);
    }

    #[test]
    fn escaped_quote_stays_in_string() {
        let expected: String = ['"', '\\', '"', sentinel('{'), '"', '{', '}'].iter().collect();
        assert_eq!(preprocess("\"\\\"{\"{}"), expected);
    }

    #[test]
    fn char_literals() {
        let expected: String = ['\'', sentinel(']'), '\'', 'a', '\'', '#'].iter().collect();
        assert_eq!(preprocess("']'a'#"), expected);
        // a trailing quote is copied as is
        assert_eq!(preprocess("1'"), "1'");
    }

    #[test]
    fn idempotent_without_literals() {
        for program in ["1[:o,]", "a{1+}2a", "(12)(3)<>&u", "5$[0]"] {
            let once = preprocess(program);
            assert_eq!(preprocess(&once), once);
        }
    }

    #[test]
    fn reveal_roundtrip() {
        for bracket in BRACKETS {
            assert_eq!(reveal(sentinel(bracket)), bracket);
        }
        assert_eq!(reveal('x'), 'x');
    }
}
