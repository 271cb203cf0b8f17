use super::reader::ModuleImage;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// SHA-256 digest of a module's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Identity and integrity metadata for one discovered module
///
/// Created once per unique path in a discovery run and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDescriptor {
    /// File name of the module
    name: String,
    path: PathBuf,
    digest: ContentDigest,
    /// Last-modified time of the module file
    modified: SystemTime,
    #[serde(skip)]
    image: ModuleImage,
}

impl ModuleDescriptor {
    pub(crate) fn new(
        path: PathBuf,
        digest: ContentDigest,
        modified: SystemTime,
        image: ModuleImage,
    ) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            name,
            path,
            digest,
            modified,
            image,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Name the module declares for itself (e.g. its ELF soname)
    pub fn declared_name(&self) -> &str {
        &self.image.name
    }

    /// Module name without its final extension, used as the assembly name
    /// for coverage decisions
    pub fn assembly_name(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }

    pub(crate) fn references(&self) -> &[PathBuf] {
        &self.image.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(path: &str) -> ModuleDescriptor {
        ModuleDescriptor::new(
            PathBuf::from(path),
            ContentDigest::new([0xab; 32]),
            SystemTime::UNIX_EPOCH,
            ModuleImage {
                name: "libfoo.so.1".to_string(),
                references: vec![PathBuf::from("/lib/libc.so.6")],
            },
        )
    }

    #[test]
    fn test_name_is_file_name() {
        let module = descriptor("/opt/app/libfoo.so");
        assert_eq!(module.name(), "libfoo.so");
        assert_eq!(module.assembly_name(), "libfoo");
        assert_eq!(module.declared_name(), "libfoo.so.1");
        assert_eq!(module.path(), Path::new("/opt/app/libfoo.so"));
        assert_eq!(module.references(), [PathBuf::from("/lib/libc.so.6")]);
    }

    #[test]
    fn test_assembly_name_keeps_inner_dots() {
        let module = descriptor("/opt/app/System.Core.dll");
        assert_eq!(module.assembly_name(), "System.Core");
    }

    #[test]
    fn test_digest_hex() {
        let digest = ContentDigest::new([0x0f; 32]);
        assert_eq!(digest.to_hex().len(), 64);
        assert!(digest.to_string().starts_with("0f0f"));
    }

    #[test]
    fn test_serializes_digest_as_hex_and_skips_image() {
        let json = serde_json::to_value(descriptor("/opt/app/libfoo.so")).unwrap();
        assert_eq!(json["name"], "libfoo.so");
        assert_eq!(json["digest"], "ab".repeat(32));
        assert!(json.get("image").is_none());
    }
}
