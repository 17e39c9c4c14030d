//! Scripted command runner standing in for hook tools, `snap`, `systemctl` and friends.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ircbridge_runtime::{CommandOutput, CommandRunner, CommandSpec, RuntimeError, RuntimeResult};

type Effect = dyn Fn(&CommandSpec) -> CommandOutput + Send + Sync;

#[derive(Clone)]
enum Response {
    Output(CommandOutput),
    Effect(Arc<Effect>),
    SpawnFailure,
}

#[derive(Clone)]
struct Rule {
    program: String,
    prefix: Vec<String>,
    response: Response,
}

impl Rule {
    fn matches(&self, spec: &CommandSpec) -> bool {
        let prefix: Vec<&str> = self.prefix.iter().map(String::as_str).collect();
        spec.matches(&self.program, &prefix)
    }
}

/// Command runner answering from scripted rules and recording every invocation.
///
/// Rules are matched on program plus argument prefix; the most recently added match wins.
/// Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedRunner {
    /// Runner with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, program: &str, prefix: &[&str], response: Response) -> &Self {
        lock(&self.rules).push(Rule {
            program: program.to_string(),
            prefix: prefix.iter().map(ToString::to_string).collect(),
            response,
        });
        self
    }

    /// Answer matching commands with `output`.
    pub fn on(&self, program: &str, prefix: &[&str], output: CommandOutput) -> &Self {
        self.push(program, prefix, Response::Output(output))
    }

    /// Answer matching commands with a successful `stdout`.
    pub fn stdout(&self, program: &str, prefix: &[&str], stdout: &str) -> &Self {
        self.on(program, prefix, CommandOutput::success(stdout))
    }

    /// Fail matching commands with `code` and `stderr`.
    pub fn fail(&self, program: &str, prefix: &[&str], code: i32, stderr: &str) -> &Self {
        self.on(program, prefix, CommandOutput::failure(code, stderr))
    }

    /// Make matching commands fail to spawn.
    pub fn missing(&self, program: &str, prefix: &[&str]) -> &Self {
        self.push(program, prefix, Response::SpawnFailure)
    }

    /// Run `effect` for matching commands; its return value is the output.
    pub fn effect<F>(&self, program: &str, prefix: &[&str], effect: F) -> &Self
    where
        F: Fn(&CommandSpec) -> CommandOutput + Send + Sync + 'static,
    {
        self.push(program, prefix, Response::Effect(Arc::new(effect)))
    }

    /// Every recorded invocation in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        lock(&self.calls).clone()
    }

    /// Invocations matching `program` and `prefix`.
    #[must_use]
    pub fn calls_to(&self, program: &str, prefix: &[&str]) -> Vec<CommandSpec> {
        lock(&self.calls)
            .iter()
            .filter(|spec| spec.matches(program, prefix))
            .cloned()
            .collect()
    }

    /// Number of invocations matching `program` and `prefix`.
    #[must_use]
    pub fn count(&self, program: &str, prefix: &[&str]) -> usize {
        self.calls_to(program, prefix).len()
    }

    /// Forget recorded invocations, keeping the rules.
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> RuntimeResult<CommandOutput> {
        lock(&self.calls).push(spec.clone());
        let response = lock(&self.rules)
            .iter()
            .rev()
            .find(|rule| rule.matches(spec))
            .map(|rule| rule.response.clone());
        match response {
            None => Ok(CommandOutput::success("")),
            Some(Response::Output(output)) => Ok(output),
            Some(Response::Effect(effect)) => Ok(effect(spec)),
            Some(Response::SpawnFailure) => Err(RuntimeError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted missing binary"),
            }),
        }
    }
}
