//! Binary readers: load a module's declared name and referenced module paths
//!
//! [`ElfModuleReader`] reads the dynamic section of ELF shared objects and
//! executables: `DT_SONAME` gives the declared name, `DT_NEEDED` entries give the
//! referenced libraries. A library name is looked up in this order:
//!
//! 1. the referencing module's own directory
//! 2. its `DT_RUNPATH`, or `DT_RPATH` when there is no runpath, with `$ORIGIN`
//!    expanded to the module's directory
//! 3. the configured search paths
//! 4. the system library directories: `/etc/ld.so.conf` (following `include`
//!    lines), the multiarch directories, then `/lib64`, `/usr/lib64`, `/lib`
//!    and `/usr/lib`

use super::error::{ModuleReadError, Result};
use object::elf;
use object::read::elf::{Dyn, FileHeader};
use object::Endianness;
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Loader configuration listing extra library directories
const LD_SO_CONF: &str = "/etc/ld.so.conf";

/// Directories the dynamic loader searches after everything else
const TRUSTED_DIRS: [&str; 4] = ["/lib64", "/usr/lib64", "/lib", "/usr/lib"];

/// Nesting limit for `include` lines in loader configuration
const MAX_INCLUDE_DEPTH: usize = 8;

/// A parsed module: the name it declares and the modules it references
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleImage {
    pub name: String,
    pub references: Vec<PathBuf>,
}

/// Reads a module file into a [`ModuleImage`]
///
/// Implementations are shared across discovery worker threads.
pub trait ModuleReader: Send + Sync {
    /// # Errors
    /// [`ModuleReadError::NotFound`] if `path` does not exist and
    /// [`ModuleReadError::Unreadable`] if it is not a valid module.
    fn read(&self, path: &Path) -> Result<ModuleImage>;
}

/// Dynamic section entries relevant to discovery
#[derive(Debug, Default)]
struct DynamicInfo {
    soname: Option<String>,
    needed: Vec<String>,
    runpath: Option<String>,
    rpath: Option<String>,
}

impl DynamicInfo {
    /// Library directories embedded in the module itself
    ///
    /// `DT_RPATH` is ignored when `DT_RUNPATH` is present, as the loader does.
    fn library_dirs(&self, origin: &Path) -> Vec<PathBuf> {
        self.runpath
            .as_deref()
            .or(self.rpath.as_deref())
            .map(|list| expand_search_list(list, origin))
            .unwrap_or_default()
    }
}

/// [`ModuleReader`] for ELF executables and shared libraries
#[derive(Debug, Clone)]
pub struct ElfModuleReader {
    search_paths: Vec<PathBuf>,
    system_paths: Vec<PathBuf>,
}

impl Default for ElfModuleReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ElfModuleReader {
    pub fn new() -> Self {
        Self::with_search_paths(Vec::<PathBuf>::new())
    }

    /// Search these directories, in order, for referenced libraries that are
    /// not next to the referencing module
    pub fn with_search_paths<I>(search_paths: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        Self {
            search_paths: search_paths.into_iter().map(Into::into).collect(),
            system_paths: system_library_paths(),
        }
    }

    /// Only look next to modules, in their embedded paths and in the configured
    /// search paths
    pub fn without_system_paths(mut self) -> Self {
        self.system_paths.clear();
        self
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn system_paths(&self) -> &[PathBuf] {
        &self.system_paths
    }

    /// Resolve a `DT_NEEDED` entry to a path
    ///
    /// Unresolvable names resolve next to the referencing module so that reading
    /// them reports the missing path.
    fn resolve(&self, module_dir: &Path, needed: &str, embedded: &[PathBuf]) -> PathBuf {
        if needed.contains('/') {
            return module_dir.join(needed);
        }

        std::iter::once(module_dir)
            .chain(embedded.iter().map(PathBuf::as_path))
            .chain(self.search_paths.iter().map(PathBuf::as_path))
            .chain(self.system_paths.iter().map(PathBuf::as_path))
            .map(|dir| dir.join(needed))
            .find(|candidate| candidate.is_file())
            .map(|found| fs::canonicalize(&found).unwrap_or(found))
            .unwrap_or_else(|| module_dir.join(needed))
    }
}

impl ModuleReader for ElfModuleReader {
    fn read(&self, path: &Path) -> Result<ModuleImage> {
        let file = File::open(path).map_err(|e| ModuleReadError::from_io(path, e))?;

        let len = file
            .metadata()
            .map_err(|e| ModuleReadError::from_io(path, e))?
            .len();
        if len == 0 {
            return Err(ModuleReadError::unreadable(path, "empty file"));
        }

        let mmap =
            unsafe { memmap2::Mmap::map(&file) }.map_err(|e| ModuleReadError::from_io(path, e))?;

        let info = parse_dynamic(&mmap).map_err(|reason| ModuleReadError::unreadable(path, reason))?;

        let module_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let embedded = info.library_dirs(module_dir);
        let references = info
            .needed
            .iter()
            .map(|needed| self.resolve(module_dir, needed, &embedded))
            .collect();

        let name = info.soname.unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        tracing::trace!("Read module {} ({})", path.display(), name);

        Ok(ModuleImage { name, references })
    }
}

fn parse_dynamic(data: &[u8]) -> std::result::Result<DynamicInfo, String> {
    let kind = object::FileKind::parse(data).map_err(|e| e.to_string())?;
    let info = match kind {
        object::FileKind::Elf32 => parse_elf::<elf::FileHeader32<Endianness>>(data),
        object::FileKind::Elf64 => parse_elf::<elf::FileHeader64<Endianness>>(data),
        other => return Err(format!("Unsupported module format: {:?}", other)),
    };
    info.map_err(|e| e.to_string())
}

fn parse_elf<Elf: FileHeader<Endian = Endianness>>(data: &[u8]) -> object::read::Result<DynamicInfo> {
    let header = Elf::parse(data)?;
    let endian = header.endian()?;
    let sections = header.sections(endian, data)?;

    let mut info = DynamicInfo::default();

    // Static executables have no dynamic section and reference nothing
    let Some((entries, strtab_index)) = sections.dynamic(endian, data)? else {
        return Ok(info);
    };
    let strings = sections.strings(endian, data, strtab_index)?;

    for entry in entries {
        match entry.tag32(endian) {
            Some(elf::DT_NEEDED) => {
                let value = entry.string(endian, strings)?;
                info.needed.push(String::from_utf8_lossy(value).into_owned());
            }
            Some(elf::DT_SONAME) => {
                let value = entry.string(endian, strings)?;
                info.soname = Some(String::from_utf8_lossy(value).into_owned());
            }
            Some(elf::DT_RUNPATH) => {
                let value = entry.string(endian, strings)?;
                info.runpath = Some(String::from_utf8_lossy(value).into_owned());
            }
            Some(elf::DT_RPATH) => {
                let value = entry.string(endian, strings)?;
                info.rpath = Some(String::from_utf8_lossy(value).into_owned());
            }
            _ => {}
        }
    }

    Ok(info)
}

/// Split a colon-separated runpath, expanding `$ORIGIN` and `${ORIGIN}`
fn expand_search_list(list: &str, origin: &Path) -> Vec<PathBuf> {
    let origin = origin.to_string_lossy();
    list.split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| {
            PathBuf::from(
                dir.replace("${ORIGIN}", &origin)
                    .replace("$ORIGIN", &origin),
            )
        })
        .collect()
}

/// Library directories the system dynamic loader searches by default
pub fn system_library_paths() -> Vec<PathBuf> {
    let mut dirs = ld_so_conf_dirs(Path::new(LD_SO_CONF));

    if let Some(triple) = multiarch_triple() {
        dirs.push(Path::new("/lib").join(&triple));
        dirs.push(Path::new("/usr/lib").join(&triple));
    }
    dirs.extend(TRUSTED_DIRS.iter().map(PathBuf::from));

    let mut seen = HashSet::new();
    dirs.retain(|dir| seen.insert(dir.clone()));
    dirs
}

/// Debian-style multiarch directory name for the running platform
fn multiarch_triple() -> Option<String> {
    if !cfg!(target_os = "linux") {
        return None;
    }
    let arch = match std::env::consts::ARCH {
        "x86" => "i386",
        other => other,
    };
    Some(format!("{arch}-linux-gnu"))
}

/// Directories listed in a loader configuration file
///
/// A missing or unreadable file contributes nothing.
fn ld_so_conf_dirs(path: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    read_ld_so_conf(path, &mut dirs, 0);
    dirs
}

fn read_ld_so_conf(path: &Path, dirs: &mut Vec<PathBuf>, depth: usize) {
    if depth > MAX_INCLUDE_DEPTH {
        tracing::warn!("Loader config include depth exceeded at {}", path.display());
        return;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!("Skipping loader config {}: {}", path.display(), e);
            return;
        }
    };
    let base = path.parent().unwrap_or_else(|| Path::new("/"));

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let mut words = line.split_whitespace();
        match words.next() {
            None | Some("hwcap") => {}
            Some("include") => {
                for pattern in words {
                    for included in expand_include(base, pattern) {
                        read_ld_so_conf(&included, dirs, depth + 1);
                    }
                }
            }
            Some(_) => dirs.extend(
                line.split(|c: char| c.is_whitespace() || c == ':' || c == ',')
                    .filter(|dir| !dir.is_empty())
                    .map(PathBuf::from),
            ),
        }
    }
}

/// Expand an `include` pattern with at most one `*` in its file name
fn expand_include(base: &Path, pattern: &str) -> Vec<PathBuf> {
    let pattern = base.join(pattern);
    let (Some(dir), Some(file)) = (
        pattern.parent(),
        pattern.file_name().and_then(|name| name.to_str()),
    ) else {
        return Vec::new();
    };
    let Some((prefix, suffix)) = file.split_once('*') else {
        return vec![pattern.clone()];
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| {
                    name.len() >= prefix.len() + suffix.len()
                        && name.starts_with(prefix)
                        && name.ends_with(suffix)
                })
        })
        .collect();
    files.sort();
    files
}
