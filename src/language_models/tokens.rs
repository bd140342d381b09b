use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tiktoken_rs::{cl100k_base, get_bpe_from_model, CoreBPE};

static ENCODINGS: OnceLock<Mutex<HashMap<String, Option<Arc<CoreBPE>>>>> = OnceLock::new();

/// The BPE encoding used by `model`, loaded once per model name.
///
/// Unknown models use `cl100k_base`. `None` means no encoding could be loaded.
pub fn encoding_for_model(model: &str) -> Option<Arc<CoreBPE>> {
    let cache = ENCODINGS.get_or_init(Default::default);
    if let Some(bpe) = cache.lock().ok().and_then(|c| c.get(model).cloned()) {
        return bpe;
    }

    let bpe = match get_bpe_from_model(model).or_else(|_| cl100k_base()) {
        Ok(bpe) => Some(Arc::new(bpe)),
        Err(e) => {
            log::debug!("no tiktoken encoding for {}: {}", model, e);
            None
        }
    };
    if let Ok(mut cache) = cache.lock() {
        cache.insert(model.to_string(), bpe.clone());
    }
    bpe
}

/// Counts the tokens of `text` with the BPE encoding used by `model`,
/// approximating from the text length if no encoding can be loaded.
pub fn count_tokens(model: &str, text: &str) -> usize {
    match encoding_for_model(model) {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => approximate_tokens(model, text),
    }
}

/// Rough token estimate: about three characters per token for gpt-4 family
/// models and four for everything else.
pub fn approximate_tokens(model: &str, text: &str) -> usize {
    let len = text.len();
    if model.contains("gpt-4") {
        (len + 2) / 3
    } else {
        (len + 3) / 4
    }
}
