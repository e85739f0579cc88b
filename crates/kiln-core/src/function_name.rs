//! Strongly-typed function name wrapper.

use crate::newtype_string::define_qualified_name;

define_qualified_name! {
    /// Name of a user-defined function or macro, optionally schema-qualified
    /// (`utils.safe_divide`).
    pub struct FunctionName;
}

impl FunctionName {
    /// Case-insensitive comparison against a reference found in SQL text.
    ///
    /// A bare reference matches a qualified name on its object part, so
    /// `safe_divide(...)` in a body resolves to `utils.safe_divide`.
    pub fn matches_reference(&self, reference: &str) -> bool {
        if self.as_str().eq_ignore_ascii_case(reference) {
            return true;
        }
        !reference.contains('.') && self.object_name().eq_ignore_ascii_case(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_name_display() {
        let name = FunctionName::try_new("safe_divide").unwrap();
        assert_eq!(format!("{}", name), "safe_divide");
    }

    #[test]
    fn test_function_name_matches_reference() {
        let name = FunctionName::try_new("utils.safe_divide").unwrap();
        assert!(name.matches_reference("utils.safe_divide"));
        assert!(name.matches_reference("SAFE_DIVIDE"));
        assert!(!name.matches_reference("other.safe_divide"));
        assert!(!name.matches_reference("divide"));
    }

    #[test]
    fn test_function_name_ord() {
        let a = FunctionName::try_new("alpha").unwrap();
        let b = FunctionName::try_new("beta").unwrap();
        assert!(a < b);
    }
}
