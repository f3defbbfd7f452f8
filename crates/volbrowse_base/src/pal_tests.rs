/* 📖 # PAL contract tests

The browse pipeline must behave the same whether it runs against MockPal or RealPal.
These tests build the same small tree with both implementations and run one shared
set of checks over them.
*/

#[cfg(test)]
mod pal_contract_tests {
    use crate::pal::{DirectoryEntry, FileKind, FilePath, MockPal, Pal, PalHandle, RealPal};
    use crate::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn check_contract(pal: &dyn Pal, root: &FilePath) {
        assert!(pal.file_exists(&root.join("a.txt")).unwrap());
        assert!(!pal.file_exists(&root.join("missing.txt")).unwrap());

        assert_eq!(pal.file_kind(root).unwrap(), FileKind::Directory);
        assert_eq!(pal.file_kind(&root.join("a.txt")).unwrap(), FileKind::File);
        assert!(pal.file_kind(&root.join("missing.txt")).is_err());

        assert_eq!(pal.canonicalize(root).unwrap(), root.clone());
        assert_eq!(
            pal.canonicalize(&root.join("sub/b.txt")).unwrap(),
            root.join("sub/b.txt")
        );

        assert_eq!(
            pal.list_directory(root).unwrap(),
            vec![
                DirectoryEntry::new("a.txt", FileKind::File),
                DirectoryEntry::new("bin", FileKind::File),
                DirectoryEntry::new("sub", FileKind::Directory),
            ]
        );
        assert_eq!(pal.list_directory(&root.join("empty")).ok(), None);
        assert!(pal.list_directory(&root.join("a.txt")).is_err());

        assert_eq!(pal.read_file_to_string(&root.join("a.txt")).unwrap(), "alpha");
        assert_eq!(pal.read_file_to_string(&root.join("sub/b.txt")).unwrap(), "");
        let err = pal.read_file_to_string(&root.join("bin")).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ReadError { .. }));
    }

    #[test]
    fn test_mock_pal_contract() {
        let mock = MockPal::new();
        mock.add_file("/data/v1/a.txt", b"alpha".to_vec());
        mock.add_file("/data/v1/bin", vec![0xC3, 0x28]);
        mock.add_file("/data/v1/sub/b.txt", Vec::new());

        check_contract(&mock, &FilePath::from("/data/v1"));
    }

    #[test]
    fn test_real_pal_contract() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(temp_dir.path().join("bin"), [0xC3, 0x28]).unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("sub").join("b.txt"), "").unwrap();

        let pal = RealPal::new();
        // Temp dirs may live behind a symlink (e.g. /tmp on macOS)
        let root = pal.canonicalize(&FilePath::from(temp_dir.path())).unwrap();
        check_contract(&pal, &root);
    }

    #[test]
    fn test_pal_handle_deref() {
        let mock = MockPal::new();
        mock.add_file("/data/test.txt", b"content".to_vec());

        let handle = PalHandle::new(mock);
        assert!(handle.file_exists(&FilePath::from("/data/test.txt")).unwrap());
    }
}
