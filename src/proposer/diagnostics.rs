//! Diagnostic text extraction
//!
//! Compiler and test-runner messages come in tool-specific formats. The
//! proposer only depends on the `DiagnosticPatterns` trait; `JvmDiagnostics`
//! understands javac/Maven and JUnit phrasing.

use crate::errors::{FixError, Result};
use regex::Regex;

/// Extracts fix-relevant tokens from failure text
pub trait DiagnosticPatterns: Send + Sync {
    /// Class named by an unresolved-symbol error
    fn unresolved_class(&self, text: &str) -> Option<String>;

    /// Package named by a missing-package error
    fn missing_package(&self, text: &str) -> Option<String>;

    /// Variable dereferenced when a null reference was hit
    fn null_dereference(&self, text: &str) -> Option<String>;

    /// `(expected, actual)` values of an assertion mismatch
    fn assertion_mismatch(&self, text: &str) -> Option<(String, String)>;
}

/// javac / Maven / JUnit message patterns
#[derive(Debug, Clone)]
pub struct JvmDiagnostics {
    unresolved_class: Regex,
    missing_package: Regex,
    null_dereference: Regex,
    assertion_mismatch: Regex,
}

impl JvmDiagnostics {
    /// Compile the pattern set
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| FixError::Pattern(format!("{}: {}", pattern, e)))
        };

        Ok(Self {
            unresolved_class: compile(r"(?is)cannot find symbol.*?class (\w+)")?,
            missing_package: compile(r"(?i)package (\S+) does not exist")?,
            null_dereference: compile(r"NullPointerException.*?(\w+)\.")?,
            assertion_mismatch: compile(r"(?i)expected:\s*<(.+?)>\s*but was:\s*<(.+?)>")?,
        })
    }

    fn first_group(regex: &Regex, text: &str) -> Option<String> {
        regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl DiagnosticPatterns for JvmDiagnostics {
    fn unresolved_class(&self, text: &str) -> Option<String> {
        Self::first_group(&self.unresolved_class, text)
    }

    fn missing_package(&self, text: &str) -> Option<String> {
        Self::first_group(&self.missing_package, text)
    }

    fn null_dereference(&self, text: &str) -> Option<String> {
        Self::first_group(&self.null_dereference, text)
    }

    fn assertion_mismatch(&self, text: &str) -> Option<(String, String)> {
        let caps = self.assertion_mismatch.captures(text)?;
        Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_class() {
        let patterns = JvmDiagnostics::new().unwrap();
        assert_eq!(
            patterns.unresolved_class("error: cannot find symbol\n  symbol: class Widget"),
            Some("Widget".to_string())
        );
        assert!(patterns.unresolved_class("cannot find symbol: variable x").is_none());
    }

    #[test]
    fn test_missing_package() {
        let patterns = JvmDiagnostics::new().unwrap();
        assert_eq!(
            patterns.missing_package("error: package io.leanda.ng.shared.models does not exist"),
            Some("io.leanda.ng.shared.models".to_string())
        );
    }

    #[test]
    fn test_null_dereference() {
        let patterns = JvmDiagnostics::new().unwrap();
        let trace = "java.lang.NullPointerException: Cannot invoke because \"repository.find\" is null";
        assert_eq!(patterns.null_dereference(trace), Some("repository".to_string()));
    }

    #[test]
    fn test_null_dereference_stays_on_exception_line() {
        let patterns = JvmDiagnostics::new().unwrap();
        let trace = "java.lang.NullPointerException\n\tat com.acme.orders.OrderService.create(OrderService.java:42)";
        assert!(patterns.null_dereference(trace).is_none());
    }

    #[test]
    fn test_assertion_mismatch() {
        let patterns = JvmDiagnostics::new().unwrap();
        assert_eq!(
            patterns.assertion_mismatch("Expected: <5> but was: <4>"),
            Some(("5".to_string(), "4".to_string()))
        );
        assert!(patterns.assertion_mismatch("values differ").is_none());
    }
}
