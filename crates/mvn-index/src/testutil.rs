//! Synthetic repository layouts for tests.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::archive::MANIFEST_ENTRY;

/// Writes a zip archive with the given `(entry, contents)` pairs.
pub(crate) fn write_jar(path: &Path, entries: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create jar parent");
    }
    let file = File::create(path).expect("create jar");
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, contents) in entries {
        writer.start_file(*name, options).expect("start entry");
        writer.write_all(contents.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish jar");
}

/// Minimal pom text. `parent` is `(groupId, artifactId, version)`.
pub(crate) fn pom_xml(
    group_id: &str,
    artifact_id: &str,
    version: &str,
    packaging: &str,
    parent: Option<(&str, &str, &str)>,
    modules: &[&str],
) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<project>\n");
    xml.push_str("  <modelVersion>4.0.0</modelVersion>\n");
    if let Some((g, a, v)) = parent {
        xml.push_str(&format!(
            "  <parent>\n    <groupId>{g}</groupId>\n    <artifactId>{a}</artifactId>\n    <version>{v}</version>\n  </parent>\n"
        ));
    }
    xml.push_str(&format!("  <groupId>{group_id}</groupId>\n"));
    xml.push_str(&format!("  <artifactId>{artifact_id}</artifactId>\n"));
    xml.push_str(&format!("  <version>{version}</version>\n"));
    xml.push_str(&format!("  <packaging>{packaging}</packaging>\n"));
    xml.push_str(&format!("  <name>{artifact_id} module</name>\n"));
    if !modules.is_empty() {
        xml.push_str("  <modules>\n");
        for module in modules {
            xml.push_str(&format!("    <module>{module}</module>\n"));
        }
        xml.push_str("  </modules>\n");
    }
    xml.push_str("</project>\n");
    xml
}

/// A repository rooted in a temp dir, laid out as `group/path/artifact/version`.
pub(crate) struct RepoFixture {
    temp: TempDir,
}

impl RepoFixture {
    pub(crate) fn new() -> Self {
        Self {
            temp: TempDir::new().expect("tempdir"),
        }
    }

    pub(crate) fn root(&self) -> &Path {
        self.temp.path()
    }

    pub(crate) fn version_dir(&self, group_id: &str, artifact_id: &str, version: &str) -> PathBuf {
        let mut dir = self.root().to_path_buf();
        for segment in group_id.split('.') {
            dir.push(segment);
        }
        dir.push(artifact_id);
        dir.push(version);
        fs::create_dir_all(&dir).expect("create version dir");
        dir
    }

    pub(crate) fn file(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        name: &str,
        contents: &str,
    ) -> PathBuf {
        let path = self.version_dir(group_id, artifact_id, version).join(name);
        fs::write(&path, contents).expect("write file");
        path
    }

    pub(crate) fn pom(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        packaging: &str,
        parent: Option<(&str, &str, &str)>,
        modules: &[&str],
    ) -> PathBuf {
        let xml = pom_xml(group_id, artifact_id, version, packaging, parent, modules);
        self.file(
            group_id,
            artifact_id,
            version,
            &format!("{artifact_id}-{version}.pom"),
            &xml,
        )
    }

    /// Writes `artifact-version.jar` with a manifest and one class per entry.
    pub(crate) fn jar(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        classes: &[&str],
    ) -> PathBuf {
        let path = self
            .version_dir(group_id, artifact_id, version)
            .join(format!("{artifact_id}-{version}.jar"));
        let manifest = format!("Manifest-Version: 1.0\nBundle-SymbolicName: {artifact_id}\n");
        let mut entries = vec![(MANIFEST_ENTRY, manifest.as_str())];
        entries.extend(classes.iter().map(|class| (*class, "cafebabe")));
        write_jar(&path, &entries);
        path
    }

    /// Root pom -> child-a (bundle), child-b (bundle), child-c (pom) ->
    /// grandchild (bundle); plus a plain jar child that must not be expanded.
    pub(crate) fn three_level_tree(&self) {
        let root = ("org.example", "root", "1.0");
        self.pom(
            "org.example",
            "root",
            "1.0",
            "pom",
            None,
            &["child-a", "child-b", "child-c", "plain"],
        );
        for child in ["child-a", "child-b"] {
            self.pom("org.example", child, "1.0", "bundle", Some(root), &[]);
            self.jar(
                "org.example",
                child,
                "1.0",
                &[&format!("org/example/{}/Api.class", child.replace('-', ""))],
            );
        }
        self.pom(
            "org.example",
            "child-c",
            "1.0",
            "pom",
            Some(root),
            &["grandchild"],
        );
        self.pom(
            "org.example",
            "grandchild",
            "1.0",
            "bundle",
            Some(("org.example", "child-c", "1.0")),
            &[],
        );
        self.pom("org.example", "plain", "1.0", "jar", Some(root), &[]);
        self.jar("org.example", "plain", "1.0", &["org/example/plain/Util.class"]);
    }
}
