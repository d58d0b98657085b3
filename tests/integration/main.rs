//! Integration tests for cssmod

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn cssmod(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("cssmod");
        cmd.current_dir(dir).env_remove("CSSMOD_CONFIG").env("CI", "1");
        cmd
    }

    fn project(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("cssmod.toml"), "").unwrap();
        for (relative, css) in files {
            let path = temp.path().join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, css).unwrap();
        }
        temp
    }

    fn assets(temp: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(temp.path().join("public/build"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        cssmod(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("CSS modules transform cache"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        cssmod(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cssmod"));
    }

    #[test]
    fn config_path() {
        let temp = project(&[]);
        let nested = temp.path().join("app/routes");
        std::fs::create_dir_all(&nested).unwrap();

        // Discovered by walking up from a nested directory
        cssmod(&nested)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cssmod.toml"))
            .stdout(predicate::str::contains("routes").not());
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        cssmod(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[transform]"))
            .stdout(predicate::str::contains("hash_prefix = \"remix\""));
    }

    #[test]
    fn config_init_creates_file() {
        let temp = TempDir::new().unwrap();
        cssmod(temp.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));

        assert!(temp.path().join("cssmod.toml").is_file());
    }

    #[test]
    fn explicit_config_must_exist() {
        let temp = TempDir::new().unwrap();
        cssmod(temp.path())
            .args(["--config", "missing.toml", "cache", "info"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"))
            .stderr(predicate::str::contains("cssmod config init"));
    }

    #[test]
    fn invalid_config_rejected() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("cssmod.toml"), "[transform]\nhash_length = 0\n").unwrap();
        cssmod(temp.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("hash_length"));
    }

    #[test]
    fn transform_prints_class_map() {
        let temp = project(&[("app/routes/a.module.css", ".foo{color:red}\n.nav-item{}")]);
        cssmod(&temp.path().join("app/routes"))
            .args(["transform", "./a.module.css"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"loader\": \"json\""))
            .stdout(predicate::str::contains("\"namespace\": \"css-modules-import\""))
            .stdout(predicate::str::contains("a__foo___"))
            .stdout(predicate::str::contains("navItem"));

        assert!(temp.path().join(".cache/css-modules").is_dir());
        assert!(!temp.path().join("public/build").exists());
    }

    #[test]
    fn transform_resolves_source_root_alias() {
        let temp = project(&[("app/routes/a.module.css", ".foo{}")]);
        cssmod(temp.path())
            .args(["transform", "--format", "plain", "~/routes/a.module.css"])
            .assert()
            .success()
            .stdout(predicate::str::contains("foo"))
            .stdout(predicate::str::contains("a__foo___"));
    }

    #[test]
    fn transform_missing_file_fails() {
        let temp = project(&[]);
        cssmod(temp.path())
            .args(["transform", "./nope.module.css"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read"));
    }

    #[test]
    fn transform_syntax_error_reports_position() {
        let temp = project(&[("app/bad.module.css", ".foo{\n  color: red;\n")]);
        cssmod(&temp.path().join("app"))
            .args(["transform", "./bad.module.css"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unclosed block"));
    }

    #[test]
    fn build_writes_content_addressed_assets() {
        let temp = project(&[
            ("app/a.module.css", ".foo{color:red}"),
            ("app/routes/b.module.css", ".bar{color:blue}"),
        ]);

        cssmod(temp.path())
            .arg("build")
            .assert()
            .success()
            .stdout(predicate::str::contains("Transforms run: 2"))
            .stdout(predicate::str::contains("Build complete"));

        let first = assets(&temp);
        assert_eq!(first.len(), 2);
        assert!(first[0].starts_with("a-") && first[0].ends_with(".css"));
        assert!(first[1].starts_with("b-") && first[1].ends_with(".css"));

        // Second build is served from the persistent cache
        cssmod(temp.path())
            .arg("build")
            .assert()
            .success()
            .stdout(predicate::str::contains("Transforms run: 0"))
            .stdout(predicate::str::contains("Persistent hits: 2"));
        assert_eq!(assets(&temp), first);
    }

    #[test]
    fn build_edit_produces_new_asset() {
        let temp = project(&[("app/a.module.css", ".foo{color:red}")]);
        cssmod(temp.path()).arg("build").assert().success();

        std::fs::write(temp.path().join("app/a.module.css"), ".foo{color:blue}").unwrap();
        cssmod(temp.path())
            .arg("build")
            .assert()
            .success()
            .stdout(predicate::str::contains("Transforms run: 1"));

        assert_eq!(assets(&temp).len(), 2);
    }

    #[test]
    fn build_reports_failures() {
        let temp = project(&[
            ("app/good.module.css", ".ok{}"),
            ("app/bad.module.css", ".broken{"),
        ]);

        cssmod(temp.path())
            .arg("build")
            .assert()
            .failure()
            .stdout(predicate::str::contains("bad.module.css:1:8: unclosed block"))
            .stderr(predicate::str::contains("Build finished with 1 error(s)"));

        assert_eq!(assets(&temp).len(), 1);
    }

    #[test]
    fn build_server_target_writes_no_assets() {
        let temp = project(&[("app/a.module.css", ".foo{}")]);
        cssmod(temp.path())
            .args(["build", "--target", "server"])
            .assert()
            .success();

        assert!(!temp.path().join("public/build").exists());
    }

    #[test]
    fn cache_info_and_clear() {
        let temp = project(&[("app/a.module.css", ".foo{}")]);
        cssmod(temp.path()).args(["build", "--target", "server"]).assert().success();

        cssmod(temp.path())
            .args(["cache", "info"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Entries: 1"));

        cssmod(temp.path())
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1 cache entries"));

        cssmod(temp.path())
            .args(["cache", "info", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"entries\": 0"));
    }
}
