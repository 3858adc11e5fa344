//! Bracket balance check

/// Whether every `(`, `[` and `{` is closed by its own kind, properly nested.
/// Run on preprocessed text, where brackets inside literals are already hidden.
pub fn balanced(code: &str) -> bool {
    let mut open = Vec::new();
    for c in code.chars() {
        match c {
            '(' | '[' | '{' => open.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if open.pop() != Some(expected) {
                    return false;
                }
            }
            _ => {}
        }
    }
    open.is_empty()
}
