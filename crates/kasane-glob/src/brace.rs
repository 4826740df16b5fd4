//! Brace expansion: `x{a,b}y` becomes `xay`, `xby`.

/// Expand the first top-level brace group and recurse.
///
/// Unbalanced braces are left in place and treated as literal characters by
/// the matcher. Empty alternatives are preserved: `{,un}do` expands to `do`
/// and `undo`.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(group) = find_group(pattern) else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..group.start];
    let suffix = &pattern[group.end + 1..];
    let body = &pattern[group.start + 1..group.end];

    let mut expanded = Vec::new();
    for alt in split_alternatives(body) {
        // Recurse to handle nested groups and groups in the suffix.
        for combined in expand_braces(&format!("{prefix}{alt}{suffix}")) {
            expanded.push(combined);
        }
    }
    expanded
}

struct Group {
    start: usize,
    end: usize,
}

/// Locate the first balanced top-level `{...}` group, honoring `\` escapes.
fn find_group(pattern: &str) -> Option<Group> {
    let mut depth = 0usize;
    let mut start = None;
    let mut escaped = false;

    for (i, c) in pattern.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        return Some(Group {
                            start: start.expect("depth tracked from start"),
                            end: i,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Split group content on top-level commas.
fn split_alternatives(body: &str) -> Vec<String> {
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut escaped = false;

    for c in body.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                current.push(c);
                escaped = true;
            }
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                alternatives.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    alternatives.push(current);
    alternatives
}
