//! The ESP state machine: recognizes template regions, escapes literal
//! text, and drives emission of the translated JavaScript.
//!
//! Each region owns its own step function, driven from a shared cursor
//! with bounded lookahead — one state, one set of transitions, one
//! burst of output per step.

use crate::{config::EspConfig, cursor::Cursor, error::Error, queue::OutputQueue, source::CharSource};

/// Current template region the state machine is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Template,
    Code,
    Expr,
    EspComment,
    CompactExpr,
}

/// The source-level quoting context tracked within `Template`, used only
/// to disambiguate `${…}` from bare `{…}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteCtx {
    None,
    Single,
    Double,
}

/// Streaming ESP-to-JavaScript transformer.
///
/// `Reader` is a [`CharSource`] itself: it pulls characters from the
/// wrapped source one at a time and exposes the translated JavaScript as
/// a character stream. It is single-use and not thread-safe: it exists
/// around one input source and is not reusable once that source is
/// exhausted.
#[derive(Debug)]
pub struct Reader<S> {
    cursor: Cursor<S>,
    queue: OutputQueue,
    region: Region,
    quote_ctx: QuoteCtx,
    /// Whether the current Template line already has an open
    /// `out.write("…` waiting to be closed.
    line_open: bool,
    /// One-shot flag: has the out-init prologue been emitted yet.
    prologue_emitted: bool,
    out_init: String,
    /// Set once the underlying source is exhausted and no further output
    /// can be produced.
    exhausted: bool,
}

impl<S> Reader<S>
where
    S: CharSource,
{
    /// Builds a transformer around a character source with the given
    /// configuration.
    pub fn new(source: S, config: EspConfig) -> Self {
        Self {
            cursor: Cursor::new(source),
            queue: OutputQueue::new(),
            region: Region::Template,
            quote_ctx: QuoteCtx::None,
            line_open: false,
            prologue_emitted: false,
            out_init: config.out_init_statement().to_string(),
            exhausted: false,
        }
    }

    /// Releases the underlying input source.
    pub fn close(self) -> S {
        self.cursor.into_source()
    }

    /// Returns the next output character, or `None` once input is
    /// exhausted and the queue is drained.
    pub fn read_one(&mut self) -> Result<Option<char>, Error> {
        loop {
            if let Some(c) = self.queue.pop() {
                return Ok(Some(c));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.step()?;
        }
    }

    /// Drains up to `buf.len()` characters into `buf`, returning the
    /// count actually written. A count smaller than `buf.len()` only
    /// occurs at end of input — otherwise this method keeps driving the
    /// state machine until the buffer fills.
    pub fn read_into(&mut self, buf: &mut [char]) -> Result<usize, Error> {
        let mut written = 0;
        while written < buf.len() {
            match self.read_one()? {
                Some(c) => {
                    buf[written] = c;
                    written += 1;
                }
                None => break,
            }
        }
        Ok(written)
    }

    /// Advances the state machine by one step, enqueuing zero or more
    /// output characters.
    fn step(&mut self) -> Result<(), Error> {
        match self.region {
            Region::Template => self.step_template(),
            Region::Code => self.step_code(),
            Region::Expr => self.step_expr(),
            Region::EspComment => self.step_esp_comment(),
            Region::CompactExpr => self.step_compact_expr(),
        }
    }

    fn emit_prologue_if_needed(&mut self) {
        if !self.prologue_emitted {
            self.queue.push_str(&self.out_init.clone());
            self.prologue_emitted = true;
        }
    }

    /// Closes an open Template line-write on entry into a tag
    /// (`<%`, `<%=`, `<%--`). Closes with `");` only —
    /// no newline, since the closure wasn't triggered by one.
    fn close_line_write_on_tag(&mut self) {
        if self.line_open {
            self.queue.push_str("\");");
            self.line_open = false;
        }
    }

    fn open_line_write_if_needed(&mut self) {
        if !self.line_open {
            self.emit_prologue_if_needed();
            self.queue.push_str("out.write(\"");
            self.line_open = true;
        }
    }

    fn step_template(&mut self) -> Result<(), Error> {
        if self.cursor.starts_with("<%--")? {
            self.cursor.consume(4)?;
            self.close_line_write_on_tag();
            self.region = Region::EspComment;
            log::trace!("esp: template -> esp_comment");
            return Ok(());
        }
        if self.cursor.starts_with("<%=")? {
            self.cursor.consume(3)?;
            self.close_line_write_on_tag();
            self.emit_prologue_if_needed();
            self.queue.push_str("out.write(");
            self.region = Region::Expr;
            log::trace!("esp: template -> expr");
            return Ok(());
        }
        if self.cursor.starts_with("<%")? {
            self.cursor.consume(2)?;
            self.close_line_write_on_tag();
            // A bare code block never pays for the writer prologue on
            // its own: the prologue is tied to literal template text and to
            // expressions, not to raw code.
            self.region = Region::Code;
            log::trace!("esp: template -> code");
            return Ok(());
        }

        match self.cursor.next_char()? {
            None => {
                if self.line_open {
                    self.queue.push_str("\");");
                    self.line_open = false;
                }
                self.exhausted = true;
            }
            Some('\n') => {
                if self.line_open {
                    self.queue.push_str("\\n\");");
                    self.queue.push('\n');
                    self.line_open = false;
                }
                // No wrapper was open: the line produced no text, and no
                // bare newline is emitted either.
            }
            Some('$') if self.quote_ctx != QuoteCtx::None && self.cursor.peek(0)? == Some('{') => {
                self.cursor.consume(1)?; // the '{'
                // `quote_ctx` survives newlines but `line_open` doesn't: a
                // quote opened on an earlier line leaves `line_open` false
                // here. Open (possibly empty) the line-write before
                // closing it, so there's always a matching `out.write("`
                // for this `");`.
                self.open_line_write_if_needed();
                self.queue.push_str("\");out.write(");
                self.region = Region::CompactExpr;
                log::trace!("esp: template -> compact_expr");
            }
            Some(c) => {
                match c {
                    '\'' => self.quote_ctx = toggle(self.quote_ctx, QuoteCtx::Single),
                    '"' => self.quote_ctx = toggle(self.quote_ctx, QuoteCtx::Double),
                    _ => {}
                }
                self.open_line_write_if_needed();
                push_escaped(&mut self.queue, c);
            }
        }
        Ok(())
    }

    fn step_code(&mut self) -> Result<(), Error> {
        if self.cursor.starts_with("%>")? {
            self.cursor.consume(2)?;
            self.region = Region::Template;
            log::trace!("esp: code -> template");
            return Ok(());
        }
        match self.cursor.next_char()? {
            Some(c) => self.queue.push(c),
            None => {
                log::warn!("esp: unterminated code block at end of input");
                self.exhausted = true;
            }
        }
        Ok(())
    }

    fn step_expr(&mut self) -> Result<(), Error> {
        if self.cursor.starts_with("%>")? {
            self.cursor.consume(2)?;
            self.queue.push_str(");");
            self.region = Region::Template;
            log::trace!("esp: expr -> template");
            return Ok(());
        }
        match self.cursor.next_char()? {
            Some(c) => self.queue.push(c),
            None => {
                log::warn!("esp: unterminated expression at end of input");
                self.exhausted = true;
            }
        }
        Ok(())
    }

    fn step_esp_comment(&mut self) -> Result<(), Error> {
        if self.cursor.starts_with("--%>")? {
            self.cursor.consume(4)?;
            self.region = Region::Template;
            log::trace!("esp: esp_comment -> template");
            return Ok(());
        }
        match self.cursor.next_char()? {
            Some(_) => {}
            None => {
                log::warn!("esp: unterminated ESP comment at end of input");
                self.exhausted = true;
            }
        }
        Ok(())
    }

    fn step_compact_expr(&mut self) -> Result<(), Error> {
        match self.cursor.peek(0)? {
            Some('}') => {
                self.cursor.consume(1)?;
                self.queue.push_str(");out.write(\"");
                self.region = Region::Template;
                // The line-write is reopened, so Template must treat it as
                // already open; otherwise the next literal character would
                // call `open_line_write_if_needed` and nest a second one.
                self.line_open = true;
                log::trace!("esp: compact_expr -> template");
            }
            Some(_) => {
                // Copied byte-for-byte, no escaping.
                if let Some(c) = self.cursor.next_char()? {
                    self.queue.push(c);
                }
            }
            None => {
                log::warn!("esp: unterminated compact expression at end of input");
                self.exhausted = true;
            }
        }
        Ok(())
    }
}

impl<S> CharSource for Reader<S>
where
    S: CharSource,
{
    /// The transformer is itself a character source: its translated
    /// JavaScript can feed straight into another consumer without ever
    /// materializing the whole output.
    fn next_char(&mut self) -> Result<Option<char>, Error> {
        self.read_one()
    }
}

fn toggle(current: QuoteCtx, quote: QuoteCtx) -> QuoteCtx {
    match (current, quote) {
        (QuoteCtx::None, q) => q,
        (c, q) if c == q => QuoteCtx::None,
        (c, _) => c,
    }
}

/// Escapes one Template-text character into its JavaScript
/// double-quoted-string form.
fn push_escaped(queue: &mut OutputQueue, c: char) {
    match c {
        '"' => queue.push_str("\\\""),
        '\\' => queue.push_str("\\\\"),
        _ => queue.push(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::IterSource;

    fn transform(input: &str) -> String {
        transform_with(input, EspConfig::default())
    }

    fn transform_with(input: &str, config: EspConfig) -> String {
        let mut reader = Reader::new(IterSource::new(input.chars()), config);
        let mut out = String::new();
        while let Some(c) = reader.read_one().unwrap() {
            out.push(c);
        }
        out
    }

    #[test]
    fn bare_code_block_has_no_prologue() {
        assert_eq!(transform("<%var%>"), "var");
    }

    #[test]
    fn plain_text_gets_prologue_and_one_line_write() {
        assert_eq!(
            transform("test"),
            "out=response.writer;out.write(\"test\");"
        );
    }

    #[test]
    fn newline_closes_the_line_write_and_emits_a_real_newline() {
        assert_eq!(
            transform("test\ntest2"),
            "out=response.writer;out.write(\"test\\n\");\nout.write(\"test2\");"
        );
    }

    #[test]
    fn code_block_with_surrounding_spaces_is_verbatim() {
        assert_eq!(transform("<% test(); %>"), " test(); ");
    }

    #[test]
    fn expression_gets_prologue_and_write_wrapper() {
        assert_eq!(
            transform("<%= x + 1 %>"),
            "out=response.writer;out.write( x + 1 );"
        );
    }

    #[test]
    fn text_around_an_expression_splits_into_three_writes() {
        assert_eq!(
            transform("<!-- <%= x + 1 %> -->"),
            "out=response.writer;out.write(\"<!-- \");out.write( x + 1 );out.write(\" -->\");"
        );
    }

    #[test]
    fn esp_comment_produces_no_output_and_no_prologue() {
        assert_eq!(transform("<%-- test(); --%>"), "");
    }

    #[test]
    fn compact_expression_inside_double_quotes_splices_the_literal() {
        assert_eq!(
            transform("<html version=\"${1+1}\">\n"),
            "out=response.writer;out.write(\"<html version=\\\"\");out.write(1+1);out.write(\"\\\">\\n\");\n"
        );
    }

    #[test]
    fn bare_braces_are_not_a_compact_expression() {
        assert_eq!(
            transform("<html version=\"{1+1}\">\n"),
            "out=response.writer;out.write(\"<html version=\\\"{1+1}\\\">\\n\");\n"
        );
    }

    #[test]
    fn compact_expression_opening_a_line_after_an_unterminated_cross_line_quote() {
        // The opening `"` leaves `quote_ctx` `Double` across the newline
        // even though the newline already closed and reset `line_open`.
        // `${` on line 2 must open its own (empty) line-write before
        // splicing, rather than emitting a dangling `");`.
        assert_eq!(
            transform("\"a\n${1}\""),
            "out=response.writer;out.write(\"\\\"a\\n\");\nout.write(\"\");out.write(1);out.write(\"\\\"\");"
        );
    }

    #[test]
    fn out_init_statement_is_configurable() {
        assert_eq!(
            transform_with("test", EspConfig::default().out_init("out=getOut();")),
            "out=getOut();out.write(\"test\");"
        );
    }

    #[test]
    fn tag_entry_closes_a_line_write_without_a_trailing_newline() {
        assert_eq!(
            transform("currentNode.text:<%= currentNode.text %>"),
            "out=response.writer;out.write(\"currentNode.text:\");out.write( currentNode.text );"
        );
    }

    #[test]
    fn expression_inside_a_quoted_attribute_still_closes_with_semicolon() {
        assert_eq!(
            transform("currentNode.text=\"<%= currentNode.text %>\""),
            "out=response.writer;out.write(\"currentNode.text=\\\"\");out.write( currentNode.text );out.write(\"\\\"\");"
        );
    }

    #[test]
    fn empty_input_yields_no_output() {
        assert_eq!(transform(""), "");
    }

    #[test]
    fn reader_is_itself_a_char_source() {
        let mut inner = Reader::new(IterSource::new("test".chars()), EspConfig::default());
        let mut outer = Reader::new(&mut inner, EspConfig::default());
        let mut out = String::new();
        while let Some(c) = outer.next_char().unwrap() {
            out.push(c);
        }
        // `outer` sees the already-translated JavaScript as its own
        // Template text and re-wraps it in another layer of out.write.
        assert_eq!(
            out,
            "out=response.writer;out.write(\"out=response.writer;out.write(\\\"test\\\");\");"
        );
    }

    #[test]
    fn read_one_returns_none_repeatedly_after_exhaustion() {
        let mut reader = Reader::new(IterSource::new("test".chars()), EspConfig::default());
        while reader.read_one().unwrap().is_some() {}
        assert_eq!(reader.read_one().unwrap(), None);
        assert_eq!(reader.read_one().unwrap(), None);
    }

    #[test]
    fn read_into_fills_the_whole_buffer_until_exhaustion() {
        let mut reader = Reader::new(IterSource::new("test".chars()), EspConfig::default());
        let expected = "out=response.writer;out.write(\"test\");";
        let mut buf = vec!['\0'; 8];
        let mut collected = String::new();
        loop {
            let n = reader.read_into(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            collected.extend(&buf[..n]);
        }
        assert_eq!(collected, expected);
    }

    #[test]
    fn read_into_deposits_at_the_given_slice_without_touching_the_rest() {
        let mut reader = Reader::new(IterSource::new("ab".chars()), EspConfig::default());
        let mut buf = ['x'; 5];
        let n = reader.read_into(&mut buf[1..3]).unwrap();
        assert_eq!(n, 2);
        assert_eq!(buf, ['x', 'o', 'u', 'x', 'x']);
    }
}
