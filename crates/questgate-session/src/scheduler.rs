use std::sync::Weak;
use std::time::Duration;

use crate::instance::EventInstance;

/// Process-wide deferred hook scheduler.
///
/// Callbacks run on the tokio runtime and hold only a weak handle to their
/// instance: an instance disposed (or dropped) before the delay elapses
/// turns the callback into a logged no-op. Must be used from within a
/// tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct HookScheduler;

impl HookScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Fire `hook` on `instance` (as sole argument) once, after `delay`.
    pub fn schedule(&self, instance: Weak<EventInstance>, hook: &str, delay: Duration) {
        let hook = hook.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(instance) = instance.upgrade() else {
                tracing::debug!(hook, "scheduled hook dropped: instance gone");
                return;
            };
            if !instance.is_live() {
                tracing::debug!(
                    hook,
                    instance = %instance.name(),
                    "scheduled hook dropped: instance disposed"
                );
                return;
            }
            instance.dispatch_hook(&hook, &[]);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::testutil::{StubScript, test_world};

    #[tokio::test]
    async fn scheduled_hook_fires_after_the_delay() {
        let world = test_world();
        let script = StubScript::new();
        let instance = world
            .directory
            .create_instance("alpha", Box::new(script.clone()))
            .unwrap();

        instance.schedule("stageTimeout", Duration::from_millis(10));
        assert_eq!(script.call_count("stageTimeout"), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(script.call_count("stageTimeout"), 1);
    }

    #[tokio::test]
    async fn disposal_before_the_delay_discards_the_callback() {
        let world = test_world();
        let script = StubScript::new();
        let instance = world
            .directory
            .create_instance("alpha", Box::new(script.clone()))
            .unwrap();

        instance.schedule("stageTimeout", Duration::from_millis(30));
        instance.dispose();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(script.call_count("stageTimeout"), 0);
    }

    #[tokio::test]
    async fn scheduling_on_a_disposed_instance_is_a_no_op() {
        let world = test_world();
        let script = StubScript::new();
        let instance = world
            .directory
            .create_instance("alpha", Box::new(script.clone()))
            .unwrap();
        instance.dispose();
        instance.schedule("stageTimeout", Duration::from_millis(5));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(script.call_count("stageTimeout"), 0);
    }
}
