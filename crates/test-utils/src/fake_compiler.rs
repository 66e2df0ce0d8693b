use std::sync::Mutex;

use reloadwatch::compiler::{CompilationProblem, CompilationResult, Compiler};
use reloadwatch::loader::naming::artifact_for_source;
use reloadwatch::store::{ResourceReader, ResourceStore};

/// Marker that makes the fake compiler reject a source.
pub const ERROR_MARKER: &str = "#error";

/// Marker that produces a warning but still emits an artifact.
pub const WARNING_MARKER: &str = "#warn";

/// Deterministic stand-in for a real compiler.
///
/// The "translation" copies a source's bytes to its artifact name
/// (`a/B.src` -> `a/B.res`). Sources containing [`ERROR_MARKER`] produce an
/// error and no artifact; a source that is no longer readable is an error
/// too.
#[derive(Debug, Default)]
pub struct FakeCompiler {
    invocations: Mutex<Vec<Vec<String>>>,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `names` argument of every `compile` call so far.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().unwrap().clone()
    }
}

impl Compiler for FakeCompiler {
    fn compile(
        &self,
        names: &[String],
        reader: &dyn ResourceReader,
        store: &dyn ResourceStore,
    ) -> CompilationResult {
        self.invocations.lock().unwrap().push(names.to_vec());

        let mut problems = Vec::new();
        for name in names {
            let Some(bytes) = reader.get_bytes(name) else {
                problems.push(CompilationProblem::error(name, "source not readable"));
                continue;
            };
            let text = String::from_utf8_lossy(&bytes);

            if let Some(line) = text.lines().position(|l| l.contains(ERROR_MARKER)) {
                problems.push(
                    CompilationProblem::error(name, "source rejected").at(line as u32 + 1, 1),
                );
                continue;
            }
            if text.contains(WARNING_MARKER) {
                problems.push(CompilationProblem::warning(name, "source flagged"));
            }

            if let Err(err) = store.write(&artifact_for_source(name), &bytes) {
                problems.push(CompilationProblem::error(name, format!("write failed: {err}")));
            }
        }

        CompilationResult::from_problems(problems)
    }
}
