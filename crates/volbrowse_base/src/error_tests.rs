/* 📖 # Rendering tests

Snapshots of how errors print, both the one-line Display used in API responses and
the Debug tree written to logs. No subscriber is installed, so span traces stay empty
and the snapshots do not depend on source locations.
*/

#[cfg(test)]
mod tests {
    use crate::error::{ErrorKind, ReadFailure};
    use crate::{ResultExt, VolbrowseError, VolbrowseResult};
    use expect_test::expect;
    use std::error::Error;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_error_context_attachment() {
        let error = VolbrowseError::message("original error")
            .context("first context")
            .context("second context");

        assert_eq!(error.get_context().len(), 2);
        assert_eq!(error.get_context()[0], "first context");
        assert_eq!(error.get_context()[1], "second context");
    }

    #[test]
    fn test_error_with_context_lazy_evaluation() {
        let mut called = false;
        let error = VolbrowseError::message("error").with_context(|| {
            called = true;
            "lazy context".to_string()
        });

        assert!(called);
        assert_eq!(error.get_context()[0], "lazy context");
    }

    #[test]
    fn test_display_with_multiple_contexts() {
        let error = VolbrowseError::message("root error")
            .context("first")
            .context("second")
            .context("third");
        assert_eq!(error.to_string(), "first: second: third: root error");
    }

    #[test]
    fn test_display_taxonomy_messages() {
        let render = |kind: ErrorKind| VolbrowseError::new(kind).to_string();

        expect![[r#"Volume not found: missing.vol"#]].assert_eq(&render(
            ErrorKind::VolumeNotFound {
                name: "missing.vol".to_string(),
            },
        ));
        expect![[r#"Invalid location URI 'not a uri': relative URL without a base"#]].assert_eq(
            &render(ErrorKind::InvalidLocation {
                location: "not a uri".to_string(),
                reason: "relative URL without a base".to_string(),
            }),
        );
        expect![[r#"Path '../../etc/passwd' resolves outside of the volume root"#]].assert_eq(
            &render(ErrorKind::PathTraversal {
                path: "../../etc/passwd".to_string(),
            }),
        );
        expect![[r#"/data/v1/x: the given path is neither a directory nor a file"#]].assert_eq(
            &render(ErrorKind::PathNotFound {
                path: PathBuf::from("/data/v1/x"),
            }),
        );
        expect![[r#"Error reading the file /data/v1/a.txt: file no longer exists"#]].assert_eq(
            &render(ErrorKind::ReadError {
                path: PathBuf::from("/data/v1/a.txt"),
                failure: ReadFailure::Vanished,
            }),
        );
    }

    #[test]
    fn test_display_includes_cause() {
        let error = VolbrowseError::message("Failed to load config")
            .caused_by(VolbrowseError::message("missing field `title`"));
        assert_eq!(
            error.to_string(),
            "Failed to load config: missing field `title`"
        );
    }

    #[test]
    fn test_error_source_access_error() {
        let error = VolbrowseError::new(ErrorKind::AccessError {
            path: PathBuf::from("/data/v1"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        });
        assert_eq!(error.source().unwrap().to_string(), "access denied");
        assert_eq!(error.root_cause().to_string(), "access denied");
    }

    #[test]
    fn test_result_ext_chaining() {
        let result: VolbrowseResult<i32> = Err(Box::new(VolbrowseError::message("root")));
        let err = result
            .context("step 1")
            .context("step 2")
            .with_context(|| "step 3".to_string())
            .unwrap_err();
        assert_eq!(err.to_string(), "step 1: step 2: step 3: root");
    }

    #[test]
    fn test_result_ext_success_untouched() {
        let result: VolbrowseResult<i32> = Ok(42);
        assert_eq!(result.context("never used").unwrap(), 42);
    }

    #[test]
    fn test_debug_pretty_print_format() {
        let error = VolbrowseError::message("something went wrong")
            .context("during directory listing")
            .context("in browse request");

        expect![[r#"
            something went wrong
            ├─ during directory listing
            └─ in browse request
        "#]]
        .assert_eq(&format!("{:?}", error));
    }

    #[test]
    fn test_debug_nested_errors() {
        let inner_error = VolbrowseError::message("inner error").context("inner context");
        let outer_error = VolbrowseError::message("outer error")
            .context("outer context")
            .caused_by(inner_error);

        expect![[r#"
            outer error
            ├─ outer context
            └─ cause: inner error
               └─ inner context
        "#]]
        .assert_eq(&format!("{:?}", outer_error));
    }

    #[test]
    fn test_debug_multiple_nested_errors() {
        let error_1 = VolbrowseError::message("error 1").context("context 1");
        let error_2 = VolbrowseError::message("error 2")
            .context("context 2")
            .caused_by(error_1);
        let error_3 = VolbrowseError::message("error 3")
            .context("context 3")
            .caused_by(error_2);

        expect![[r#"
            error 3
            ├─ context 3
            └─ cause: error 2
               ├─ context 2
               └─ cause: error 1
                  └─ context 1
        "#]]
        .assert_eq(&format!("{:?}", error_3));
    }
}
