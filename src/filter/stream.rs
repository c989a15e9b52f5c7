use std::pin::Pin;

use futures_util::{Stream, StreamExt, stream};

use crate::core::{ChatStreamItem, TagSpec};

/// Incremental counterpart of [`BatchFilter`](super::BatchFilter).
///
/// Feed chunks with [`push`](Self::push) as they arrive and call
/// [`finish`](Self::finish) once the upstream is exhausted. Text that could
/// still turn out to be the start of a delimiter is held back, never more
/// than [`TagSpec::max_holdback`] bytes of it.
///
/// At end of stream an unterminated span behaves differently from batch
/// mode: its interior has already been dropped and stays dropped, and only
/// the held partial close tag is released. Buffer the whole message and use
/// the batch filter if exact parity matters.
#[derive(Debug, Clone)]
pub struct StreamingTagFilter {
    spec: TagSpec,
    buffer: String,
    inside: bool,
}

impl StreamingTagFilter {
    pub fn new(spec: TagSpec) -> Self {
        Self {
            spec,
            buffer: String::new(),
            inside: false,
        }
    }

    pub fn is_inside(&self) -> bool {
        self.inside
    }

    /// Text held back because it may be the start of a delimiter.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Returns the part of `buffer + chunk` that is safe to show now.
    pub fn push(&mut self, chunk: &str) -> String {
        if chunk.is_empty() {
            return String::new();
        }

        let mut text = std::mem::take(&mut self.buffer);
        text.push_str(chunk);

        let mut output = String::new();
        let mut cursor = 0;

        loop {
            let rest = &text[cursor..];

            if self.inside {
                let close_tag = self.spec.close_tag();
                match rest.find(close_tag) {
                    Some(pos) => {
                        cursor += pos + close_tag.len();
                        self.inside = false;
                        log::trace!("closed span at {:?}", close_tag);
                    }
                    None => {
                        cursor = text.len() - partial_suffix_len(rest, close_tag);
                        break;
                    }
                }
            } else {
                let open_tag = self.spec.open_tag();
                match rest.find(open_tag) {
                    Some(pos) => {
                        output.push_str(&rest[..pos]);
                        cursor += pos + open_tag.len();
                        self.inside = true;
                        log::trace!("opened span at {:?}", open_tag);
                    }
                    None => {
                        let safe = rest.len() - partial_suffix_len(rest, open_tag);
                        output.push_str(&rest[..safe]);
                        cursor += safe;
                        break;
                    }
                }
            }
        }

        self.buffer = text[cursor..].to_string();
        output
    }

    /// Releases whatever is still held. The filter is spent afterwards.
    pub fn finish(self) -> String {
        if self.inside {
            log::debug!(
                "stream ended inside an unterminated {:?} span, releasing {} held bytes",
                self.spec.open_tag(),
                self.buffer.len()
            );
        }
        self.buffer
    }
}

impl Default for StreamingTagFilter {
    fn default() -> Self {
        Self::new(TagSpec::default())
    }
}

/// Length of the longest suffix of `text` that is a strict prefix of `tag`.
fn partial_suffix_len(text: &str, tag: &str) -> usize {
    let longest = text.len().min(tag.len() - 1);
    (1..=longest)
        .rev()
        .find(|&len| tag.is_char_boundary(len) && text.as_bytes().ends_with(&tag.as_bytes()[..len]))
        .unwrap_or(0)
}

/// Filters a stream of text chunks. Upstream errors are passed through as-is,
/// empty fragments are skipped, and the held tail is yielded when the
/// upstream ends.
pub fn filter_stream<S, E>(
    upstream: S,
    spec: TagSpec,
) -> Pin<Box<dyn Stream<Item = Result<String, E>> + Send>>
where
    S: Stream<Item = Result<String, E>> + Send + 'static,
    E: Send + 'static,
{
    let state = (Box::pin(upstream), Some(StreamingTagFilter::new(spec)));

    Box::pin(stream::unfold(state, |(mut upstream, mut filter)| async move {
        loop {
            let active = filter.as_mut()?;
            match upstream.next().await {
                Some(Ok(chunk)) => {
                    let output = active.push(&chunk);
                    if !output.is_empty() {
                        return Some((Ok(output), (upstream, filter)));
                    }
                }
                Some(Err(e)) => return Some((Err(e), (upstream, filter))),
                None => {
                    let rest = filter.take()?.finish();
                    if rest.is_empty() {
                        return None;
                    }
                    return Some((Ok(rest), (upstream, None)));
                }
            }
        }
    }))
}

/// Filters the content of streamed chat items.
///
/// Every upstream item is forwarded, so `done` always reaches the caller.
/// The item marked `done` carries the flushed tail of its message. Content
/// arriving after `done` belongs to a new message and gets a fresh filter.
/// If the upstream ends mid-message, a final `done` item carrying the tail is
/// yielded when there is one.
pub fn filter_chat_stream<S, E>(
    upstream: S,
    spec: TagSpec,
) -> Pin<Box<dyn Stream<Item = Result<ChatStreamItem, E>> + Send>>
where
    S: Stream<Item = Result<ChatStreamItem, E>> + Send + 'static,
    E: Send + 'static,
{
    let state = (Box::pin(upstream), spec, None::<StreamingTagFilter>);

    Box::pin(stream::unfold(state, |(mut upstream, spec, mut message)| async move {
        match upstream.next().await {
            Some(Ok(mut item)) => {
                let active = message.get_or_insert_with(|| StreamingTagFilter::new(spec.clone()));
                let mut content = active.push(&item.content);
                if item.done {
                    if let Some(spent) = message.take() {
                        content.push_str(&spent.finish());
                    }
                }
                item.content = content;
                Some((Ok(item), (upstream, spec, message)))
            }
            Some(Err(e)) => Some((Err(e), (upstream, spec, message))),
            None => {
                let rest = message.take()?.finish();
                if rest.is_empty() {
                    return None;
                }
                Some((Ok(ChatStreamItem::last(rest)), (upstream, spec, None)))
            }
        }
    }))
}

/// Synchronous form of [`filter_stream`] over any iterator of chunks.
pub fn filter_chunks<I>(chunks: I, spec: TagSpec) -> FilterChunks<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    FilterChunks {
        chunks: chunks.into_iter(),
        filter: Some(StreamingTagFilter::new(spec)),
    }
}

pub struct FilterChunks<I> {
    chunks: I,
    filter: Option<StreamingTagFilter>,
}

impl<I> Iterator for FilterChunks<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let active = self.filter.as_mut()?;
            match self.chunks.next() {
                Some(chunk) => {
                    let output = active.push(chunk.as_ref());
                    if !output.is_empty() {
                        return Some(output);
                    }
                }
                None => {
                    let rest = self.filter.take()?.finish();
                    return (!rest.is_empty()).then_some(rest);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(chunks: &[&str]) -> Vec<String> {
        let mut filter = StreamingTagFilter::default();
        let mut fragments: Vec<String> = chunks.iter().map(|c| filter.push(c)).collect();
        fragments.push(filter.finish());
        fragments
    }

    #[test]
    fn split_open_tag_is_held_then_dropped() {
        let fragments = run(&["a<contem", "plate>hidden</contemplate>b"]);
        assert_eq!(fragments, vec!["a", "b", ""]);
    }

    #[test]
    fn plain_text_is_emitted_immediately() {
        let mut filter = StreamingTagFilter::default();
        assert_eq!(filter.push("hello "), "hello ");
        assert_eq!(filter.push("world"), "world");
        assert_eq!(filter.buffered(), "");
    }

    #[test]
    fn partial_open_prefix_is_flushed_at_end() {
        let mut filter = StreamingTagFilter::default();
        assert_eq!(filter.push("x <cont"), "x ");
        assert_eq!(filter.buffered(), "<cont");
        assert_eq!(filter.finish(), "<cont");
    }

    #[test]
    fn held_prefix_released_once_it_diverges() {
        let mut filter = StreamingTagFilter::default();
        assert_eq!(filter.push("1 <cont"), "1 ");
        assert_eq!(filter.push("inue> 2"), "<continue> 2");
    }

    #[test]
    fn partial_close_inside_span_is_held() {
        let mut filter = StreamingTagFilter::default();
        assert_eq!(filter.push("<contemplate>abc</contem"), "");
        assert!(filter.is_inside());
        assert_eq!(filter.buffered(), "</contem");
        assert_eq!(filter.push("plate>tail"), "tail");
        assert!(!filter.is_inside());
    }

    #[test]
    fn unterminated_span_releases_only_partial_close() {
        let fragments = run(&["a<contemplate>b</con"]);
        assert_eq!(fragments.concat(), "a</con");
    }

    #[test]
    fn multiple_spans_in_one_chunk() {
        let fragments = run(&["a<contemplate>x</contemplate>b<contemplate>y</contemplate>c"]);
        assert_eq!(fragments.concat(), "abc");
    }

    #[test]
    fn zero_length_chunks_are_harmless() {
        let fragments = run(&["", "a", "", "<contemplate>", "", "</contemplate>", "b", ""]);
        assert_eq!(fragments.concat(), "ab");
    }

    #[test]
    fn holdback_never_exceeds_bound() {
        let spec = TagSpec::default();
        let bound = spec.max_holdback();
        let mut filter = StreamingTagFilter::new(spec);
        let input = "pre <contemplate> long hidden body </contemplat</contemplate> post <<<contemplat";
        for ch in input.chars() {
            filter.push(&ch.to_string());
            assert!(filter.buffered().len() <= bound);
        }
    }

    #[test]
    fn partial_suffix_respects_char_boundaries() {
        assert_eq!(partial_suffix_len("abc<é", "<éx>"), 3);
        assert_eq!(partial_suffix_len("abc", "<x>"), 0);
        assert_eq!(partial_suffix_len("", "<x>"), 0);
        assert_eq!(partial_suffix_len("<x", "<x>"), 2);
    }

    #[test]
    fn chunk_iterator_skips_empty_fragments() {
        let fragments: Vec<String> =
            filter_chunks(["a<contem", "plate>", "hidden", "</contemplate>b"], TagSpec::default()).collect();
        assert_eq!(fragments, vec!["a", "b"]);
    }
}
