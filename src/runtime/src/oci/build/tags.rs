//! Tag chain: the sequence of intermediate image tags inside one layout.
//!
//! Every image-producing step reads `source` and writes a freshly derived
//! `destination`; once the step succeeds the destination becomes the new
//! source. Tags are derived by hashing, so the same script always produces
//! the same tag sequence:
//!
//! ```text
//! source_0 = sha256(seed ":" "docker://" <from>) "-src"
//! dest_1   = sha256(seed ":" source_0)
//! dest_n   = sha256(seed ":" dest_{n-1})
//! ```
//!
//! where `seed` is the SHA-256 of the Dockerfile contents.

use orca_core::error::{BuildError, Result};
use sha2::{Digest, Sha256};

/// Hex SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Current and in-flight image tags for one build.
#[derive(Debug, Clone)]
pub struct TagChain {
    seed: String,
    source: Option<String>,
    destination: Option<String>,
    last_generated: Option<String>,
    owned: Vec<String>,
}

impl TagChain {
    /// Start an empty chain seeded with the script digest.
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            source: None,
            destination: None,
            last_generated: None,
            owned: Vec::new(),
        }
    }

    /// Derive and record the source tag for the base image `source_ref`.
    pub fn start(&mut self, source_ref: &str) -> String {
        let tag = format!("{}-src", sha256_hex(&format!("{}:{}", self.seed, source_ref)));
        self.source = Some(tag.clone());
        self.destination = None;
        self.last_generated = Some(tag.clone());
        self.own(&tag);
        tag
    }

    /// Derive the next destination tag. Fails before [`TagChain::start`].
    pub fn next_destination(&mut self) -> Result<String> {
        let previous = self.last_generated.as_deref().ok_or_else(|| {
            BuildError::FormatError("no base image: FROM must come first".to_string())
        })?;
        let tag = sha256_hex(&format!("{}:{}", self.seed, previous));
        self.destination = Some(tag.clone());
        self.last_generated = Some(tag.clone());
        self.own(&tag);
        Ok(tag)
    }

    /// The in-flight step succeeded: its destination becomes the source.
    pub fn commit(&mut self) {
        if let Some(destination) = self.destination.take() {
            self.source = Some(destination);
        }
    }

    /// The in-flight step failed: drop the destination, keep the source.
    pub fn abort(&mut self) {
        self.destination = None;
    }

    /// Tag of the last committed image.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Tag of the in-flight step, if any.
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Every tag this build created, in creation order.
    pub fn owned(&self) -> &[String] {
        &self.owned
    }

    /// Whether a source image exists yet.
    pub fn is_started(&self) -> bool {
        self.source.is_some()
    }

    fn own(&mut self, tag: &str) {
        if !self.owned.iter().any(|t| t == tag) {
            self.owned.push(tag.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_chain_advances_only_on_commit() {
        let mut chain = TagChain::new("seed");
        let src = chain.start("docker://scratch");
        assert!(src.ends_with("-src"));
        assert_eq!(chain.source(), Some(src.as_str()));
        assert_eq!(chain.destination(), None);

        let d1 = chain.next_destination().unwrap();
        assert_eq!(chain.source(), Some(src.as_str()));
        assert_eq!(chain.destination(), Some(d1.as_str()));

        chain.commit();
        assert_eq!(chain.source(), Some(d1.as_str()));
        assert_eq!(chain.destination(), None);
        assert_eq!(chain.owned(), &[src, d1]);
    }

    #[test]
    fn test_abort_keeps_source() {
        let mut chain = TagChain::new("seed");
        let src = chain.start("docker://alpine");
        chain.next_destination().unwrap();
        chain.abort();
        assert_eq!(chain.source(), Some(src.as_str()));
        assert_eq!(chain.destination(), None);
    }

    #[test]
    fn test_n_steps_own_n_plus_one_tags() {
        let mut chain = TagChain::new("seed");
        chain.start("docker://alpine");
        let mut last = String::new();
        for _ in 0..5 {
            last = chain.next_destination().unwrap();
            chain.commit();
        }
        assert_eq!(chain.owned().len(), 6);
        assert_eq!(chain.source(), Some(last.as_str()));
    }

    #[test]
    fn test_derivation_is_deterministic_and_seeded() {
        let run = |seed: &str| {
            let mut chain = TagChain::new(seed);
            chain.start("docker://alpine");
            for _ in 0..3 {
                chain.next_destination().unwrap();
                chain.commit();
            }
            chain.owned().to_vec()
        };
        assert_eq!(run("a"), run("a"));
        assert_ne!(run("a"), run("b"));

        let tags = run("a");
        let mut unique = tags.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), tags.len());
    }

    #[test]
    fn test_next_before_start_fails() {
        let mut chain = TagChain::new("seed");
        assert!(chain.next_destination().is_err());
        assert!(!chain.is_started());
    }
}
