use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;

use questgate_core::ids::{ObstacleId, PlayerId, TemplateId};

use crate::instance::EventInstance;

/// Non-instance arguments passed along with a hook invocation. The owning
/// instance is always the first parameter of [`EventScript::invoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookArg {
    Player(PlayerId),
    Obstacle(ObstacleId),
    Monster(TemplateId),
}

#[derive(Debug)]
pub enum ScriptError {
    /// The engine faulted while evaluating the hook body.
    Fault(String),
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fault(m) => write!(f, "script fault: {m}"),
        }
    }
}

impl std::error::Error for ScriptError {}

/// Externally supplied rule engine driving one event instance.
///
/// Implementations resolve hooks by name. A name the engine does not
/// implement must return `Ok(None)` rather than an error. Hook bodies may
/// call back into the instance's APIs, but must never trigger another hook
/// dispatch on the same instance: the engine is non-reentrant.
pub trait EventScript: Send + Sync {
    fn invoke(
        &self,
        name: &str,
        instance: &EventInstance,
        args: &[HookArg],
    ) -> Result<Option<Value>, ScriptError>;
}

/// Serializes every call into the event script and enforces the disposal
/// boundary: a retired dispatcher never invokes the script again.
///
/// Script faults are caught here, logged, and reported to callers as an
/// absent result; hook dispatch never propagates an engine failure.
pub struct HookDispatcher {
    script: Box<dyn EventScript>,
    gate: Mutex<()>,
    live: AtomicBool,
    slow_warn: Duration,
}

impl HookDispatcher {
    pub fn new(script: Box<dyn EventScript>, slow_warn: Duration) -> Self {
        Self {
            script,
            gate: Mutex::new(()),
            live: AtomicBool::new(true),
            slow_warn,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Permanently stop dispatching. Idempotent; does not wait for an
    /// in-flight call to finish.
    pub fn retire(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn dispatch(&self, name: &str, instance: &EventInstance, args: &[HookArg]) -> Option<Value> {
        if !self.is_live() {
            return None;
        }
        let _serial = self
            .gate
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Re-check under the gate: the instance may have been disposed while
        // this call waited on an in-flight hook.
        if !self.is_live() {
            return None;
        }
        let started = Instant::now();
        let result = match self.script.invoke(name, instance, args) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    hook = name,
                    instance = %instance.name(),
                    error = %e,
                    "event script fault; treating as no result"
                );
                None
            },
        };
        let elapsed = started.elapsed();
        if elapsed > self.slow_warn {
            tracing::warn!(
                hook = name,
                instance = %instance.name(),
                elapsed_ms = elapsed.as_millis() as u64,
                "slow hook"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    use crate::testutil::test_world;

    struct SlowScript {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl EventScript for SlowScript {
        fn invoke(
            &self,
            _name: &str,
            _instance: &EventInstance,
            _args: &[HookArg],
        ) -> Result<Option<Value>, ScriptError> {
            self.log.lock().unwrap().push("enter");
            thread::sleep(Duration::from_millis(5));
            self.log.lock().unwrap().push("exit");
            Ok(None)
        }
    }

    #[test]
    fn hook_calls_never_interleave() {
        let world = test_world();
        let log = Arc::new(Mutex::new(Vec::new()));
        let instance = world
            .directory
            .create_instance(
                "alpha",
                Box::new(SlowScript {
                    log: Arc::clone(&log),
                }),
            )
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let instance = Arc::clone(&instance);
                thread::spawn(move || instance.player_killed(1))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 8);
        for pair in log.chunks(2) {
            assert_eq!(pair, ["enter", "exit"]);
        }
    }
}
