//! Linker collaborator.
//!
//! The core hands over the finished module, the target triple recorded in
//! it, and the list of imported module names; this collaborator composes
//! and runs the external system compiler with the correct sysroot, runtime
//! library and one object file per import. Process spawning lives here and
//! only here.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::compiler::CompiledModule;
use crate::error::{CompileError, Result};

pub struct Linker {
    /// External system compiler used to assemble and link the artifact.
    pub system_compiler: PathBuf,
    pub sysroot: Option<PathBuf>,
    pub runtime_library: Option<PathBuf>,
    /// Directory holding one object file per importable module.
    pub import_path: PathBuf,
}

impl Default for Linker {
    fn default() -> Self {
        Linker {
            system_compiler: PathBuf::from("clang"),
            sysroot: None,
            runtime_library: None,
            import_path: PathBuf::from("."),
        }
    }
}

impl Linker {
    /// Compose the external compiler invocation for a compiled module.
    pub fn command(&self, compiled: &CompiledModule, ir_file: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.system_compiler);
        command.arg(ir_file);
        command.arg("-o").arg(output);
        command.arg(format!("--target={}", compiled.module.target_triple));
        if let Some(sysroot) = &self.sysroot {
            command.arg(format!("--sysroot={}", sysroot.display()));
        }
        for import in &compiled.imported_modules {
            command.arg(self.import_path.join(format!("{}.o", import)));
        }
        if let Some(runtime) = &self.runtime_library {
            command.arg(runtime);
        }
        command
    }

    /// Write the textual IR next to the output file and run the external
    /// compiler over it. Failures surface as backend errors.
    pub fn link(&self, compiled: &CompiledModule, output: &Path) -> Result<()> {
        let ir_file = output.with_extension("ll");
        std::fs::write(&ir_file, compiled.module.to_string())
            .map_err(|e| CompileError::backend(format!("Failed to write '{}': {}", ir_file.display(), e)))?;

        let mut command = self.command(compiled, &ir_file, output);
        let status = command.status().map_err(|e| {
            CompileError::backend(format!(
                "Failed to run '{}': {}",
                self.system_compiler.display(),
                e
            ))
        })?;
        if !status.success() {
            return Err(CompileError::backend(format!(
                "Linker exited with status {}",
                status.code().unwrap_or(-1)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile, CompileOptions};
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn compiled(source: &str) -> CompiledModule {
        let mut cursor = tokenize(source).expect("tokenizes");
        let root = parse(&mut cursor).expect("parses");
        compile(&root, CompileOptions::production()).expect("compiles")
    }

    #[test]
    fn command_carries_target_and_imports() {
        let module = compiled("import runtime\nimport hashing\n");
        let linker = Linker {
            import_path: PathBuf::from("/opt/advm/lib"),
            ..Linker::default()
        };
        let command = linker.command(&module, Path::new("out.ll"), Path::new("out.wasm"));

        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"--target=wasm32-unknown-wasi".to_string()));
        assert!(args.iter().any(|a| a.ends_with("runtime.o")));
        assert!(args.iter().any(|a| a.ends_with("hashing.o")));
    }

    #[test]
    fn link_writes_ir_before_invoking_the_toolchain() {
        let module = compiled("print(1)\n");
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("out.wasm");
        let linker = Linker {
            system_compiler: PathBuf::from("/nonexistent/advm-cc"),
            ..Linker::default()
        };
        let error = linker.link(&module, &output).unwrap_err();
        assert_eq!(error.kind, crate::error::ErrorKind::Backend);
        assert!(output.with_extension("ll").exists());
    }

    #[test]
    fn sysroot_is_forwarded_when_set() {
        let module = compiled("");
        let linker = Linker {
            sysroot: Some(PathBuf::from("/opt/wasi-sysroot")),
            ..Linker::default()
        };
        let command = linker.command(&module, Path::new("out.ll"), Path::new("out.wasm"));
        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"--sysroot=/opt/wasi-sysroot".to_string()));
    }
}
