//! Path tokenizer
//!
//! Splits on `/`, drops empty components and `.`, and keeps `..` as an
//! explicit parent step for the walker to resolve against the inode's
//! parent index. Depth is capped at eight components; names are limited to
//! the on-disk record size minus the NUL.

use super::disk::FS_NAME_MAX;
use crate::lib::error::{KernelError, Result};

pub const MAX_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component<'a> {
    Normal(&'a str),
    Parent,
}

/// Tokenize a path. Relative paths are resolved from the root like
/// absolute ones; the shell's cwd handling happens above the kernel core.
pub fn parse(path: &str) -> Result<heapless::Vec<Component<'_>, MAX_DEPTH>> {
    let mut out = heapless::Vec::new();
    for token in path.split('/') {
        let component = match token {
            "" | "." => continue,
            ".." => Component::Parent,
            name => {
                if name.len() > FS_NAME_MAX - 1 {
                    return Err(KernelError::InvalidArgument);
                }
                Component::Normal(name)
            }
        };
        out.push(component).map_err(|_| KernelError::Bounds)?;
    }
    Ok(out)
}

/// Split into the parent walk and the final name. The leaf must be a plain
/// name: creating or removing `.`/`..`/the root is rejected here.
pub fn parse_with_leaf(path: &str) -> Result<(heapless::Vec<Component<'_>, MAX_DEPTH>, &str)> {
    let mut components = parse(path)?;
    match components.pop() {
        Some(Component::Normal(name)) => Ok((components, name)),
        _ => Err(KernelError::InvalidArgument),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_empty_and_dot_components() {
        let c = parse("//a/./b/").unwrap();
        assert_eq!(c.as_slice(), &[Component::Normal("a"), Component::Normal("b")]);
        assert!(parse("/").unwrap().is_empty());
        assert!(parse("").unwrap().is_empty());
        assert!(parse("./././.").unwrap().is_empty());
    }

    #[test]
    fn keeps_parent_steps() {
        let c = parse("/a/../b").unwrap();
        assert_eq!(
            c.as_slice(),
            &[
                Component::Normal("a"),
                Component::Parent,
                Component::Normal("b")
            ]
        );
    }

    #[test]
    fn depth_limit_is_eight() {
        assert!(parse("/1/2/3/4/5/6/7/8").is_ok());
        assert_eq!(parse("/1/2/3/4/5/6/7/8/9"), Err(KernelError::Bounds));
    }

    #[test]
    fn name_length_limit() {
        let long = [b'n'; FS_NAME_MAX];
        let path = alloc::format!("/{}", core::str::from_utf8(&long).unwrap());
        assert_eq!(parse(&path), Err(KernelError::InvalidArgument));
    }

    #[test]
    fn leaf_extraction() {
        let (parents, leaf) = parse_with_leaf("/d/x").unwrap();
        assert_eq!(parents.as_slice(), &[Component::Normal("d")]);
        assert_eq!(leaf, "x");

        let (parents, leaf) = parse_with_leaf("/top").unwrap();
        assert!(parents.is_empty());
        assert_eq!(leaf, "top");
    }

    #[test]
    fn leaf_must_be_a_plain_name() {
        assert_eq!(parse_with_leaf("/"), Err(KernelError::InvalidArgument));
        assert_eq!(parse_with_leaf("/a/.."), Err(KernelError::InvalidArgument));
        assert_eq!(parse_with_leaf("."), Err(KernelError::InvalidArgument));
    }
}
