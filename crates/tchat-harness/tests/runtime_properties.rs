//! Property-based tests through the production runtime.
//!
//! Random keystroke scripts run against the scripted backend, so command
//! results interleave with input in arbitrary ways. The standard invariants
//! are checked after every render; any violation fails the driver.

use std::{sync::Arc, time::Duration};

use proptest::prelude::*;
use tchat_app::{AppConfig, KeyInput, Runtime};
use tchat_core::{AccessToken, Identity, IdentityStore};
use tchat_harness::{
    BackendOp, InvariantRegistry, MemoryIdentityStore, ScriptedBackend, SimDriver, SimEnv,
    SimTokenInspector,
};

fn key_strategy() -> impl Strategy<Value = KeyInput> {
    prop_oneof![
        6 => prop::char::range('a', 'z').prop_map(KeyInput::Char),
        1 => Just(KeyInput::Char('/')),
        3 => Just(KeyInput::Enter),
        2 => Just(KeyInput::Tab),
        1 => Just(KeyInput::Backspace),
        1 => Just(KeyInput::Esc),
        1 => Just(KeyInput::Up),
        1 => Just(KeyInput::PageDown),
        1 => Just(KeyInput::Ctrl('l')),
        1 => Just(KeyInput::Ctrl('o')),
        1 => Just(KeyInput::Ctrl('x')),
    ]
}

/// Run `keys` then quit, optionally resuming a stored session first.
fn run_script(keys: Vec<KeyInput>, latency_ms: u64, resume: bool) -> Result<(), TestCaseError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .map_err(|e| TestCaseError::fail(e.to_string()))?;

    rt.block_on(async move {
        let env = SimEnv::new();
        let backend = Arc::new(
            ScriptedBackend::new(env).with_latency(Duration::from_millis(latency_ms)),
        );
        let store = Arc::new(MemoryIdentityStore::new());
        if resume {
            let user = backend.user("alice").ok_or_else(|| TestCaseError::fail("no alice"))?;
            let token = backend.issue_token("alice").unwrap_or_else(|| AccessToken::new("x"));
            store
                .save(&Identity { user, token })
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
        }

        let mut driver = SimDriver::new().with_invariants(InvariantRegistry::standard());
        for key in keys {
            driver = driver.key(key);
        }
        let store_handle: Arc<dyn IdentityStore> = store.clone();
        let mut runtime = Runtime::new(
            driver.quit(),
            Arc::clone(&backend),
            store_handle,
            Arc::new(SimTokenInspector),
            env,
            AppConfig::default(),
        );

        let result = tokio::time::timeout(Duration::from_secs(60), runtime.run()).await;
        prop_assert!(result.is_ok(), "session did not finish");
        prop_assert!(matches!(result, Ok(Ok(()))), "driver failed: {:?}", result);
        prop_assert!(runtime.app().is_terminated());
        prop_assert!(runtime.driver().is_stopped());
        // Every send the backend accepted went out through the dispatcher
        let (stored, sends) = (backend.messages().len(), backend.calls(BackendOp::Send));
        prop_assert!(stored <= sends, "{} messages from {} sends", stored, sends);
        Ok(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_random_input_keeps_invariants_logged_out(
        keys in prop::collection::vec(key_strategy(), 0..80),
        latency_ms in 0u64..500,
    ) {
        run_script(keys, latency_ms, false)?;
    }

    #[test]
    fn prop_random_input_keeps_invariants_logged_in(
        keys in prop::collection::vec(key_strategy(), 0..80),
        latency_ms in 0u64..500,
    ) {
        run_script(keys, latency_ms, true)?;
    }
}
