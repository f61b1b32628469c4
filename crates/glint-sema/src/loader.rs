// loader.rs
//
// Finds and loads metadata for imported modules. For each include directory
// in order: a loose `.gmeta` file beats an object file beats an assembly
// file; the first hit wins. Every blob must open with the metadata magic.

use std::path::{Path, PathBuf};

use glint_frontend::{Context, ImportRef, Module};

use crate::elf;
use crate::errors::{FatalError, IceError};
use crate::metadata::{self, ModuleDescription, METADATA_FILE_EXTENSION, METADATA_SECTION_NAME};

/// Load one import into the module's symbol space, or fail the compilation.
pub fn load_import(
    ctx: &Context,
    module: &mut Module,
    import: &ImportRef,
) -> Result<(), FatalError> {
    let name = module.interner.resolve(import.name).to_string();
    let mut paths_tried = Vec::new();

    for dir in ctx.include_directories() {
        let mut found = try_gmeta(dir, &name, &mut paths_tried)?;
        if found.is_none() {
            found = try_object(dir, &name, &mut paths_tried)?;
        }
        if found.is_none() {
            found = try_assembly(dir, &name, &mut paths_tried)?;
        }

        if let Some((path, blob)) = found {
            if blob.is_empty() {
                return Err(FatalError::EmptyMetadata {
                    name,
                    path: path.display().to_string(),
                });
            }
            if !ModuleDescription::has_valid_magic(&blob) {
                return Err(FatalError::BadMetadataMagic {
                    name,
                    path: path.display().to_string(),
                });
            }
            tracing::debug!(module = %name, path = %path.display(), "loading import");
            return metadata::deserialise(module, &blob).map_err(|e| {
                FatalError::CorruptMetadata {
                    name,
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            });
        }
    }

    Err(FatalError::ImportNotFound {
        name,
        paths_tried: paths_tried
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        span: import.span.into(),
    })
}

type Candidate = Option<(PathBuf, Vec<u8>)>;

fn try_gmeta(
    dir: &Path,
    name: &str,
    paths_tried: &mut Vec<PathBuf>,
) -> Result<Candidate, FatalError> {
    let path = dir.join(format!("{name}{METADATA_FILE_EXTENSION}"));
    paths_tried.push(path.clone());
    if !path.exists() {
        return Ok(None);
    }
    let blob = std::fs::read(&path).map_err(|e| FatalError::CorruptMetadata {
        name: name.to_string(),
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(Some((path, blob)))
}

fn try_object(
    dir: &Path,
    name: &str,
    paths_tried: &mut Vec<PathBuf>,
) -> Result<Candidate, FatalError> {
    let stems = [name.to_string(), format!("lib{name}")];
    for stem in &stems {
        for ext in ["o", "obj", "a"] {
            let path = dir.join(format!("{stem}.{ext}"));
            paths_tried.push(path.clone());
            if !path.exists() {
                continue;
            }
            let object = std::fs::read(&path).map_err(|e| FatalError::CorruptMetadata {
                name: name.to_string(),
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            if !elf::is_elf(&object) {
                return Err(IceError::new(format!(
                    "unrecognized file format of module {name} at {}",
                    path.display()
                ))
                .into());
            }
            let blob =
                elf::section_by_name(&object, METADATA_SECTION_NAME).map_err(|e| {
                    FatalError::CorruptMetadata {
                        name: name.to_string(),
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    }
                })?;
            return Ok(Some((path, blob)));
        }
    }
    Ok(None)
}

fn try_assembly(
    dir: &Path,
    name: &str,
    paths_tried: &mut Vec<PathBuf>,
) -> Result<Candidate, FatalError> {
    let path = dir.join(format!("{name}.s"));
    paths_tried.push(path.clone());
    if path.exists() {
        return Err(IceError::new(
            "parsing Glint module metadata from an assembly file is not implemented; \
             provide a gmeta or object file instead",
        )
        .into());
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_frontend::Span;
    use std::fs;
    use tempfile::TempDir;

    fn import_ref(module: &mut Module, name: &str) -> ImportRef {
        ImportRef {
            name: module.interner.intern(name),
            span: Span::default(),
        }
    }

    fn minimal_blob() -> Vec<u8> {
        // Just the header: zero types, zero decls.
        let mut blob = vec![
            ModuleDescription::DEFAULT_VERSION,
            ModuleDescription::MAGIC_BYTE0,
            ModuleDescription::MAGIC_BYTE1,
            ModuleDescription::MAGIC_BYTE2,
        ];
        blob.extend_from_slice(&0u32.to_le_bytes());
        blob.extend_from_slice(&0u32.to_le_bytes());
        blob
    }

    #[test]
    fn loads_a_loose_gmeta_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("util.gmeta"), minimal_blob()).unwrap();

        let mut ctx = Context::new();
        ctx.add_include_directory(temp.path());
        let mut module = Module::new("main");
        let import = import_ref(&mut module, "util");

        assert!(load_import(&ctx, &mut module, &import).is_ok());
    }

    #[test]
    fn rejects_bad_magic() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("util.gmeta"), b"\x02\x00\x00\x00junk").unwrap();

        let mut ctx = Context::new();
        ctx.add_include_directory(temp.path());
        let mut module = Module::new("main");
        let import = import_ref(&mut module, "util");

        assert!(matches!(
            load_import(&ctx, &mut module, &import),
            Err(FatalError::BadMetadataMagic { .. })
        ));
    }

    #[test]
    fn extracts_metadata_from_an_elf_object() {
        let temp = TempDir::new().unwrap();
        let object = elf::object_with_section(METADATA_SECTION_NAME, &minimal_blob());
        fs::write(temp.path().join("libutil.o"), object).unwrap();

        let mut ctx = Context::new();
        ctx.add_include_directory(temp.path());
        let mut module = Module::new("main");
        let import = import_ref(&mut module, "util");

        assert!(load_import(&ctx, &mut module, &import).is_ok());
    }

    #[test]
    fn gmeta_beats_object_in_the_same_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("util.gmeta"), minimal_blob()).unwrap();
        // A corrupt object would fail the load if it were picked first.
        fs::write(temp.path().join("util.o"), b"garbage").unwrap();

        let mut ctx = Context::new();
        ctx.add_include_directory(temp.path());
        let mut module = Module::new("main");
        let import = import_ref(&mut module, "util");

        assert!(load_import(&ctx, &mut module, &import).is_ok());
    }

    #[test]
    fn first_include_directory_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("util.gmeta"), minimal_blob()).unwrap();
        fs::write(second.path().join("util.gmeta"), b"\x07bad").unwrap();

        let mut ctx = Context::new();
        ctx.add_include_directory(first.path());
        ctx.add_include_directory(second.path());
        let mut module = Module::new("main");
        let import = import_ref(&mut module, "util");

        assert!(load_import(&ctx, &mut module, &import).is_ok());
    }

    #[test]
    fn missing_module_lists_every_path_tried() {
        let temp = TempDir::new().unwrap();
        let mut ctx = Context::new();
        ctx.add_include_directory(temp.path());
        let mut module = Module::new("main");
        let import = import_ref(&mut module, "nosuch");

        let err = load_import(&ctx, &mut module, &import).unwrap_err();
        let FatalError::ImportNotFound { paths_tried, .. } = err else {
            panic!("expected ImportNotFound, got {err:?}");
        };
        // gmeta + 6 object candidates + assembly
        assert_eq!(paths_tried.lines().count(), 8);
        assert!(paths_tried.contains("nosuch.gmeta"));
        assert!(paths_tried.contains("libnosuch.a"));
        assert!(paths_tried.contains("nosuch.s"));
    }

    #[test]
    fn assembly_metadata_is_an_internal_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("util.s"), ".section .glint\n").unwrap();

        let mut ctx = Context::new();
        ctx.add_include_directory(temp.path());
        let mut module = Module::new("main");
        let import = import_ref(&mut module, "util");

        assert!(matches!(
            load_import(&ctx, &mut module, &import),
            Err(FatalError::Ice(_))
        ));
    }
}
