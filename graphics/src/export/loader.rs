//! Loading exporter modules with `libloading`.
//!
//! A module is opened, called once and closed again within
//! [`call_exporter`]. Nothing from the module outlives the call.

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use matforge_abi::{ABI_VERSION, ABI_VERSION_SYMBOL, AbiVersionFn, EXPORT_ENTRY_SYMBOL, ExportContext, ExportEntryFn};

use crate::error::ExportError;

/// Run the exporter at `module_path` against `context`.
///
/// If the module exports `matforge_export_abi_version`, its value must
/// equal [`ABI_VERSION`]. The context is only read by the module.
pub fn call_exporter(module_path: &Path, context: &ExportContext) -> Result<(), ExportError> {
    if module_path.as_os_str().is_empty() {
        return Err(ExportError::InvalidArgument("empty exporter path".into()));
    }

    log::info!("Loading exporter {}", module_path.display());

    // SAFETY: loading runs the module's initializers. Exporters are trusted
    // code placed in a configured directory.
    let library = unsafe { Library::new(module_path) }.map_err(|e| ExportError::ModuleLoad {
        path: module_path.to_path_buf(),
        message: e.to_string(),
    })?;

    let result = run_entry(&library, module_path, context);

    if let Err(e) = library.close() {
        log::warn!("Failed to unload exporter {}: {e}", module_path.display());
    }

    match &result {
        Ok(()) => log::info!("Exporter {} finished", module_path.display()),
        Err(e) => log::error!("{e}"),
    }
    result
}

fn run_entry(library: &Library, path: &Path, context: &ExportContext) -> Result<(), ExportError> {
    // SAFETY: the symbol type matches `AbiVersionFn` in matforge-abi.
    let version: Result<Symbol<AbiVersionFn>, _> = unsafe { library.get(ABI_VERSION_SYMBOL) };
    match version {
        Ok(version) => {
            // SAFETY: takes no arguments, returns a plain integer.
            let found = unsafe { version() };
            if found != ABI_VERSION {
                return Err(ExportError::AbiMismatch {
                    path: path.to_path_buf(),
                    expected: ABI_VERSION,
                    found,
                });
            }
        }
        Err(_) => log::debug!(
            "Exporter {} does not report an ABI version, assuming {ABI_VERSION}",
            path.display()
        ),
    }

    // SAFETY: the symbol type matches `ExportEntryFn` in matforge-abi.
    let entry: Symbol<ExportEntryFn> =
        unsafe { library.get(EXPORT_ENTRY_SYMBOL) }.map_err(|_| ExportError::SymbolNotFound {
            path: path.to_path_buf(),
            symbol: symbol_name(EXPORT_ENTRY_SYMBOL),
        })?;

    // SAFETY: `context` and everything it points to stay alive for the call.
    let ok = unsafe { entry(context) };
    if ok {
        Ok(())
    } else {
        Err(ExportError::ExporterReturnedFalse(path.to_path_buf()))
    }
}

fn symbol_name(symbol: &[u8]) -> String {
    String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol)).into_owned()
}

/// Check whether `path` looks like a loadable module on any platform.
pub fn is_exporter_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("so") | Some("dylib") | Some("dll")
    )
}

/// List exporter modules in `dirs`, sorted by path.
///
/// Missing directories are skipped with a debug message.
pub fn discover_exporters<P: AsRef<Path>>(dirs: &[P]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for dir in dirs {
        let dir = dir.as_ref();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("Skipping exporter directory {}: {e}", dir.display());
                continue;
            }
        };
        found.extend(
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && is_exporter_file(path)),
        );
    }
    found.sort();
    found
}
