pub const DEFAULT_BATCH_SIZE: usize = 512;
pub const DEFAULT_STRIP_NEW_LINES: bool = true;

/// Splits `texts` into consecutive batches of at most `batch_size` items.
///
/// A zero batch size puts everything in one batch.
pub fn batch_texts(texts: &[String], batch_size: usize) -> Vec<Vec<String>> {
    if batch_size == 0 {
        return vec![texts.to_vec()];
    }
    texts.chunks(batch_size).map(<[String]>::to_vec).collect()
}

pub fn maybe_remove_newlines(texts: &[String], remove_new_lines: bool) -> Vec<String> {
    if !remove_new_lines {
        return texts.to_vec();
    }
    texts.iter().map(|t| t.replace('\n', " ")).collect()
}
