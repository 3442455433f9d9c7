//! Path navigation
//!
//! Addresses are `/`-separated. An input starting with `/` is absolute;
//! anything else is relative to a current location. Normalisation drops empty
//! and `.` segments and lets `..` pop one segment, clamping at the root.
//!
//! These are pure functions over strings. The mutable current location lives
//! in the `Store` handle.

/// Root marker and separator
pub const ROOT: &str = "/";

/// Normalise an absolute or relative path into an absolute one (relative to `/`).
pub fn normalize(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            s => stack.push(s),
        }
    }
    if stack.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", stack.join("/"))
    }
}

/// Resolve `input` against `current`. An absolute `input` ignores `current`.
pub fn resolve_path(current: &str, input: &str) -> String {
    if input.starts_with('/') {
        normalize(input)
    } else {
        normalize(&format!("{}/{}", current, input))
    }
}

/// New current location after moving to `input`.
///
/// Only computes the address; the handle checks that it names a container.
pub fn change_location(current: &str, input: &str) -> String {
    resolve_path(current, input)
}

/// Append one child name to an absolute path.
pub fn join(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Split a normalised absolute path into parent and last segment.
///
/// The root has no parent and returns None.
pub fn split_parent(path: &str) -> Option<(String, &str)> {
    let trimmed = path.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    let name = &trimmed[idx + 1..];
    if name.is_empty() {
        return None;
    }
    let parent = if idx == 0 {
        ROOT.to_string()
    } else {
        trimmed[..idx].to_string()
    };
    Some((parent, name))
}

/// Last segment of a path, or "" for the root.
pub fn basename(path: &str) -> &str {
    split_parent(path).map_or("", |(_, name)| name)
}
