#![no_main]

use libfuzzer_sys::fuzz_target;

use pollsync::config::PollsConfig;
use pollsync::polls::PollCache;
use pollsync::text::MarkdownProcessor;
use pollsync::updates::ServerUpdate;
use std::sync::Arc;

/// Decodes arbitrary bytes as a batch of server updates and replays them
/// through a cache.
///
/// This catches:
/// - Panics from update decoding on adversarial JSON
/// - Chosen indexes that are unsorted, duplicated or past the answer list
fuzz_target!(|data: &[u8]| {
    let updates: Vec<ServerUpdate> = match serde_json::from_slice(data) {
        Ok(u) => u,
        Err(_) => return,
    };

    let cache = PollCache::new(Arc::new(MarkdownProcessor::new()), &PollsConfig::default());
    for update in &updates {
        if let Some(poll) = cache.handle_server_update(update) {
            assert!(poll.chosen_indexes.windows(2).all(|w| w[0] < w[1]));
            assert!(poll.chosen_indexes.iter().all(|&i| i < poll.answers.len()));
        }
    }
});
