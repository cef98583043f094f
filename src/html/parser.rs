//! A parse session that turns SAX callbacks into [`HtmlParsingEvent`]s.
//!
//! The session owns a handler table, fills in its event slots and the error
//! bridge, and hands the table to a [`SaxDriver`] together with a context
//! pointing back at itself. Errors reach the session the same way they reach
//! any other host: rendered by the bridge and forwarded to a registered host
//! handler.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    error::Error,
    ffi::{CStr, c_char, c_void},
    fmt::Display,
    mem::take,
    ptr::null,
};

use crate::{
    bridge::HostErrorFunc,
    encoding::CharEncoding,
    globals::{host_error_handler, set_host_error_handler},
};

use super::{
    HtmlParserOptions, HtmlParsingEvent, HtmlSaxHandler,
    error_handler::html_parser_set_error_handler,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlParserError {
    /// The parser reported an error; `message` is the rendered text.
    Parsing { message: String },
    Aborted,
    Unknown,
}

impl Display for HtmlParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parsing { message } => write!(f, "{message}"),
            Self::Aborted => write!(f, "Parsing was aborted"),
            Self::Unknown => write!(f, "An unknown error occurred"),
        }
    }
}

impl Error for HtmlParserError {}

/// The parser that reports into a session.
///
/// An implementation runs over `input` and, for every event, reads the
/// current table out of `sax` and calls the matching slot with `ctx`.
/// Reading the table per event matters: a session being aborted empties its
/// slots, and the driver should simply stop seeing them.
///
/// Returns 0 on success, like the parser's own entry points.
pub trait SaxDriver {
    fn parse(
        &mut self,
        sax: &Cell<HtmlSaxHandler>,
        ctx: *mut c_void,
        input: &[u8],
        encoding: CharEncoding,
        options: HtmlParserOptions,
    ) -> i32;
}

thread_local! {
    // Context of the session currently parsing on this thread.
    static ACTIVE_SESSION: Cell<*const c_void> = const { Cell::new(null()) };
}

#[derive(Default)]
struct ParseState {
    aborting: bool,
    // Set once an error ends the session; later events are dropped.
    finished: bool,
    error: Option<HtmlParserError>,
    characters: String,
}

#[doc(alias = "HTMLParser")]
pub struct HtmlParser {
    data: Vec<u8>,
    encoding: CharEncoding,
    options: HtmlParserOptions,
    sax: Cell<HtmlSaxHandler>,
    state: RefCell<ParseState>,
}

impl HtmlParser {
    pub fn new(
        data: impl Into<Vec<u8>>,
        encoding: CharEncoding,
        options: HtmlParserOptions,
    ) -> Self {
        let mut sax = HtmlSaxHandler::sax2();
        html_parser_set_error_handler(Some(&mut sax));
        Self {
            data: data.into(),
            encoding,
            options,
            sax: Cell::new(sax),
            state: RefCell::new(ParseState::default()),
        }
    }

    pub fn encoding(&self) -> CharEncoding {
        self.encoding
    }

    pub fn options(&self) -> HtmlParserOptions {
        self.options
    }

    /// The handler table the driver is given.
    pub fn sax_handler(&self) -> HtmlSaxHandler {
        self.sax.get()
    }

    /// The last error recorded, if any.
    pub fn error(&self) -> Option<HtmlParserError> {
        self.state.borrow().error.clone()
    }

    pub fn is_aborting(&self) -> bool {
        self.state.borrow().aborting
    }

    /// Run `driver` over the input and collect every event.
    pub fn parse<D: SaxDriver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> Result<Vec<HtmlParsingEvent>, HtmlParserError> {
        let mut events = vec![];
        self.parse_with(driver, |_, event| events.push(event))?;
        Ok(events)
    }

    /// Run `driver` over the input, handing each event to `on_event` as soon
    /// as it is complete.
    ///
    /// `on_event` may call [`HtmlParser::abort_parsing`]. An aborted parse
    /// fails with [`HtmlParserError::Aborted`]; the events handed out before
    /// the abort stay delivered.
    ///
    /// Without [`HtmlParserOptions::RECOVER`], the first error reported by
    /// the parser ends the session with that error.
    pub fn parse_with<D, F>(&self, driver: &mut D, mut on_event: F) -> Result<(), HtmlParserError>
    where
        D: SaxDriver + ?Sized,
        F: FnMut(&HtmlParser, HtmlParsingEvent),
    {
        *self.state.borrow_mut() = ParseState::default();
        self.install_handlers();

        let session = Session {
            parser: self,
            on_event: RefCell::new(&mut on_event),
        };
        let ctx = &session as *const Session<'_> as *mut c_void;
        log::debug!(
            target: "saxbridge::html",
            "parsing {} bytes as {:?} with options {:#x}",
            self.data.len(),
            self.encoding,
            self.options.bits()
        );
        let result = {
            let _host = HostHandlerGuard::install(html_parser_host_error_handler, ctx);
            driver.parse(&self.sax, ctx, &self.data, self.encoding, self.options)
        };
        session.flush_characters();

        let state = self.state.borrow();
        if state.aborting {
            log::debug!(target: "saxbridge::html", "parse aborted with status {result}");
            return Err(HtmlParserError::Aborted);
        }
        if state.finished {
            return Err(state.error.clone().unwrap_or(HtmlParserError::Unknown));
        }
        if result == 0 || self.options.contains(HtmlParserOptions::RECOVER) {
            log::debug!(target: "saxbridge::html", "parse finished with status {result}");
            Ok(())
        } else {
            log::debug!(target: "saxbridge::html", "parse failed with status {result}");
            Err(state.error.clone().unwrap_or(HtmlParserError::Unknown))
        }
    }

    /// Stop delivering events.
    ///
    /// Every event and error slot is cleared, so the driver receives nothing
    /// more from this session, and [`HtmlParserError::Aborted`] is recorded.
    #[doc(alias = "abortParsing")]
    pub fn abort_parsing(&self) {
        let mut state = self.state.borrow_mut();
        state.aborting = true;
        state.error = Some(HtmlParserError::Aborted);
        state.characters.clear();
        drop(state);

        let mut sax = self.sax.get();
        sax.start_document = None;
        sax.end_document = None;
        sax.start_element = None;
        sax.end_element = None;
        sax.characters = None;
        sax.comment = None;
        sax.cdata_block = None;
        sax.processing_instruction = None;
        sax.error = None;
        self.sax.set(sax);
        log::debug!(target: "saxbridge::html", "parse aborted");
    }

    fn install_handlers(&self) {
        let mut sax = self.sax.get();
        sax.start_document = Some(on_start_document);
        sax.end_document = Some(on_end_document);
        sax.start_element = Some(on_start_element);
        sax.end_element = Some(on_end_element);
        sax.characters = Some(on_characters);
        sax.comment = Some(on_comment);
        sax.cdata_block = Some(on_cdata_block);
        sax.processing_instruction = Some(on_processing_instruction);
        html_parser_set_error_handler(Some(&mut sax));
        self.sax.set(sax);
    }
}

/// What the driver's context points at while a parse runs.
struct Session<'a> {
    parser: &'a HtmlParser,
    on_event: RefCell<&'a mut dyn FnMut(&HtmlParser, HtmlParsingEvent)>,
}

impl Session<'_> {
    fn emit(&self, event: HtmlParsingEvent) {
        if self.parser.state.borrow().finished {
            return;
        }
        log::trace!(target: "saxbridge::html", "{event:?}");
        let Ok(mut on_event) = self.on_event.try_borrow_mut() else {
            log::warn!(target: "saxbridge::html", "event raised from an event handler dropped");
            return;
        };
        (*on_event)(self.parser, event);
    }

    fn flush_characters(&self) {
        let characters = take(&mut self.parser.state.borrow_mut().characters);
        if !characters.is_empty() {
            self.emit(HtmlParsingEvent::Characters(characters));
        }
    }

    /// Flush pending text, then emit `event`.
    fn emit_after_text(&self, event: HtmlParsingEvent) {
        self.flush_characters();
        self.emit(event);
    }

    fn record_error(&self, message: String) {
        let mut state = self.parser.state.borrow_mut();
        if state.finished || state.aborting {
            return;
        }
        log::debug!(target: "saxbridge::html", "parser error: {}", message.trim_end());
        state.error = Some(HtmlParserError::Parsing { message });
        if !self.parser.options.contains(HtmlParserOptions::RECOVER) {
            state.finished = true;
            state.characters.clear();
        }
    }
}

/// # Safety
/// `ctx` must be the context handed to the driver by [`HtmlParser::parse_with`],
/// and the parse must still be running.
unsafe fn session<'a>(ctx: *mut c_void) -> &'a Session<'a> {
    unsafe { &*(ctx as *const Session<'a>) }
}

unsafe fn on_start_document(ctx: *mut c_void) {
    let session = unsafe { session(ctx) };
    session.emit_after_text(HtmlParsingEvent::StartDocument);
}

unsafe fn on_end_document(ctx: *mut c_void) {
    let session = unsafe { session(ctx) };
    session.emit_after_text(HtmlParsingEvent::EndDocument);
}

unsafe fn on_start_element(ctx: *mut c_void, name: &str, atts: &[(String, Option<String>)]) {
    let session = unsafe { session(ctx) };
    // Attributes without a value are not reported.
    let attributes = atts
        .iter()
        .filter_map(|(name, value)| Some((name.clone(), value.clone()?)))
        .collect::<BTreeMap<_, _>>();
    session.emit_after_text(HtmlParsingEvent::StartElement {
        name: name.to_owned(),
        attributes,
    });
}

unsafe fn on_end_element(ctx: *mut c_void, name: &str) {
    let session = unsafe { session(ctx) };
    session.emit_after_text(HtmlParsingEvent::EndElement {
        name: name.to_owned(),
    });
}

unsafe fn on_characters(ctx: *mut c_void, chars: &str) {
    let session = unsafe { session(ctx) };
    let mut state = session.parser.state.borrow_mut();
    if !state.finished {
        state.characters.push_str(chars);
    }
}

unsafe fn on_comment(ctx: *mut c_void, value: &str) {
    let session = unsafe { session(ctx) };
    session.emit_after_text(HtmlParsingEvent::Comment(value.to_owned()));
}

unsafe fn on_cdata_block(ctx: *mut c_void, value: &[u8]) {
    let session = unsafe { session(ctx) };
    session.emit_after_text(HtmlParsingEvent::Cdata(value.to_vec()));
}

unsafe fn on_processing_instruction(ctx: *mut c_void, target: &str, data: Option<&str>) {
    let session = unsafe { session(ctx) };
    session.emit_after_text(HtmlParsingEvent::ProcessingInstruction {
        target: target.to_owned(),
        data: data.unwrap_or_default().to_owned(),
    });
}

/// Host end of the error bridge while a session is parsing.
///
/// Only reports carrying the running session's context are recorded.
unsafe extern "C" fn html_parser_host_error_handler(ctx: *mut c_void, msg: *const c_char) {
    if ctx.is_null() || ACTIVE_SESSION.get() != ctx as *const c_void {
        log::debug!(target: "saxbridge::html", "error for foreign context {ctx:?} ignored");
        return;
    }
    let session = unsafe { session(ctx) };
    let message = unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned();
    session.record_error(message);
}

/// Registers a host handler for the session at `ctx` and puts the previous
/// handler and session back on drop.
struct HostHandlerGuard {
    previous: Option<HostErrorFunc>,
    previous_session: *const c_void,
}

impl HostHandlerGuard {
    fn install(handler: HostErrorFunc, ctx: *mut c_void) -> Self {
        let previous = host_error_handler();
        let previous_session = ACTIVE_SESSION.replace(ctx as *const c_void);
        set_host_error_handler(Some(handler));
        Self {
            previous,
            previous_session,
        }
    }
}

impl Drop for HostHandlerGuard {
    fn drop(&mut self) {
        set_host_error_handler(self.previous);
        ACTIVE_SESSION.set(self.previous_session);
    }
}

#[cfg(test)]
mod tests {
    use crate::format::FormatArg;

    use super::*;

    enum Step {
        StartDocument,
        EndDocument,
        Start(&'static str, Vec<(String, Option<String>)>),
        End(&'static str),
        Text(&'static str),
        Comment(&'static str),
        Error(&'static str, Vec<FormatArg<'static>>),
    }

    struct Scripted {
        steps: Vec<Step>,
        status: i32,
        seen: Option<(CharEncoding, HtmlParserOptions, usize)>,
    }

    impl Scripted {
        fn new(steps: Vec<Step>, status: i32) -> Self {
            Self {
                steps,
                status,
                seen: None,
            }
        }
    }

    impl SaxDriver for Scripted {
        fn parse(
            &mut self,
            sax: &Cell<HtmlSaxHandler>,
            ctx: *mut c_void,
            input: &[u8],
            encoding: CharEncoding,
            options: HtmlParserOptions,
        ) -> i32 {
            self.seen = Some((encoding, options, input.len()));
            for step in &self.steps {
                let table = sax.get();
                unsafe {
                    match step {
                        Step::StartDocument => table.start_document.map(|f| f(ctx)),
                        Step::EndDocument => table.end_document.map(|f| f(ctx)),
                        Step::Start(name, atts) => table.start_element.map(|f| f(ctx, name, atts)),
                        Step::End(name) => table.end_element.map(|f| f(ctx, name)),
                        Step::Text(text) => table.characters.map(|f| f(ctx, text)),
                        Step::Comment(text) => table.comment.map(|f| f(ctx, text)),
                        Step::Error(msg, args) => table.error.map(|f| f(ctx, msg, args)),
                    };
                }
            }
            self.status
        }
    }

    fn document(middle: Vec<Step>) -> Vec<Step> {
        let mut steps = vec![Step::StartDocument];
        steps.extend(middle);
        steps.push(Step::EndDocument);
        steps
    }

    #[test]
    fn events_in_document_order_with_merged_text() {
        let parser = HtmlParser::new(
            "<p class=x hidden>a&amp;b</p>",
            CharEncoding::UTF8,
            HtmlParserOptions::default(),
        );
        let mut driver = Scripted::new(
            document(vec![
                Step::Start(
                    "p",
                    vec![("class".into(), Some("x".into())), ("hidden".into(), None)],
                ),
                Step::Text("a"),
                Step::Text("&"),
                Step::Text("b"),
                Step::End("p"),
                Step::Comment(" c "),
            ]),
            0,
        );
        let events = parser.parse(&mut driver).unwrap();
        let attributes = BTreeMap::from([("class".to_owned(), "x".to_owned())]);
        assert_eq!(
            events,
            [
                HtmlParsingEvent::StartDocument,
                HtmlParsingEvent::StartElement {
                    name: "p".into(),
                    attributes
                },
                HtmlParsingEvent::Characters("a&b".into()),
                HtmlParsingEvent::EndElement { name: "p".into() },
                HtmlParsingEvent::Comment(" c ".into()),
                HtmlParsingEvent::EndDocument,
            ]
        );
        assert_eq!(
            driver.seen,
            Some((CharEncoding::UTF8, HtmlParserOptions::default(), 29))
        );
        assert!(parser.error().is_none());
    }

    #[test]
    fn trailing_text_is_flushed_before_end_document() {
        let parser = HtmlParser::new("tail", CharEncoding::UTF8, HtmlParserOptions::default());
        let mut driver = Scripted::new(document(vec![Step::Text("tail")]), 0);
        let events = parser.parse(&mut driver).unwrap();
        assert_eq!(
            events,
            [
                HtmlParsingEvent::StartDocument,
                HtmlParsingEvent::Characters("tail".into()),
                HtmlParsingEvent::EndDocument,
            ]
        );
    }

    #[test]
    fn error_without_recover_ends_the_session() {
        let parser = HtmlParser::new("<blink>", CharEncoding::UTF8, HtmlParserOptions::NO_NET);
        let mut driver = Scripted::new(
            document(vec![
                Step::Start("p", vec![]),
                Step::Error("Tag %s invalid\n", vec!["blink".into()]),
                Step::Start("blink", vec![]),
            ]),
            0,
        );
        let err = parser.parse(&mut driver).unwrap_err();
        assert_eq!(
            err,
            HtmlParserError::Parsing {
                message: "Tag blink invalid\n".into()
            }
        );
        assert_eq!(err.to_string(), "Tag blink invalid\n");
    }

    #[test]
    fn recover_keeps_going_and_records_the_error() {
        let parser = HtmlParser::new("<blink>", CharEncoding::UTF8, HtmlParserOptions::default());
        let mut driver = Scripted::new(
            document(vec![
                Step::Error("Invalid tag at line %d", vec![42.into()]),
                Step::Start("blink", vec![]),
            ]),
            1,
        );
        let events = parser.parse(&mut driver).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            parser.error(),
            Some(HtmlParserError::Parsing {
                message: "Invalid tag at line 42".into()
            })
        );
    }

    #[test]
    fn failing_status_without_error_is_unknown() {
        let parser = HtmlParser::new("", CharEncoding::UTF8, HtmlParserOptions::empty());
        let mut driver = Scripted::new(vec![], -1);
        assert_eq!(parser.parse(&mut driver), Err(HtmlParserError::Unknown));
        assert_eq!(HtmlParserError::Unknown.to_string(), "An unknown error occurred");
    }

    #[test]
    fn abort_from_event_handler_stops_delivery() {
        let parser = HtmlParser::new("<a><b>", CharEncoding::UTF8, HtmlParserOptions::empty());
        let mut driver = Scripted::new(
            document(vec![
                Step::Start("a", vec![]),
                Step::Start("b", vec![]),
                Step::Error("late %d", vec![1.into()]),
            ]),
            1,
        );
        let mut events = vec![];
        let result = parser.parse_with(&mut driver, |parser, event| {
            if matches!(&event, HtmlParsingEvent::StartElement { name, .. } if name == "a") {
                parser.abort_parsing();
            }
            events.push(event);
        });
        assert_eq!(result, Err(HtmlParserError::Aborted));
        assert_eq!(events.len(), 2);
        assert!(parser.is_aborting());
        assert_eq!(parser.error(), Some(HtmlParserError::Aborted));
        assert_eq!(HtmlParserError::Aborted.to_string(), "Parsing was aborted");
        let sax = parser.sax_handler();
        assert!(sax.start_element.is_none());
        assert!(sax.error.is_none());
    }

    #[test]
    fn abort_fails_even_when_recovering() {
        let parser = HtmlParser::new("<a>", CharEncoding::UTF8, HtmlParserOptions::default());
        let mut driver = Scripted::new(document(vec![Step::Start("a", vec![])]), 0);
        let result = parser.parse(&mut driver);
        assert!(result.is_ok());
        let result = parser.parse_with(&mut driver, |parser, _| parser.abort_parsing());
        assert_eq!(result, Err(HtmlParserError::Aborted));
    }

    #[test]
    fn errors_for_other_contexts_are_not_recorded() {
        let parser = HtmlParser::new("<a>", CharEncoding::UTF8, HtmlParserOptions::empty());
        let mut driver = Scripted::new(document(vec![Step::Start("a", vec![])]), 0);
        let mut other = 0u64;
        let other_ctx = &raw mut other as *mut c_void;
        let mut table = HtmlSaxHandler::sax2();
        html_parser_set_error_handler(Some(&mut table));
        let mut events = vec![];
        let result = parser.parse_with(&mut driver, |_, event| {
            // Another table raising an error with its own context.
            if let Some(error) = table.error {
                unsafe { error(other_ctx, "Tag %s invalid\n", &["blink".into()]) };
            }
            events.push(event);
        });
        assert_eq!(result, Ok(()));
        assert_eq!(events.len(), 3);
        assert!(parser.error().is_none());
        assert_eq!(other, 0);
    }

    #[test]
    fn previous_host_handler_is_restored() {
        unsafe extern "C" fn outer(_ctx: *mut c_void, _msg: *const c_char) {}

        set_host_error_handler(Some(outer));
        let parser = HtmlParser::new("", CharEncoding::UTF8, HtmlParserOptions::default());
        parser.parse(&mut Scripted::new(vec![], 0)).unwrap();
        assert_eq!(
            host_error_handler().map(|f| f as usize),
            Some(outer as HostErrorFunc as usize)
        );
        set_host_error_handler(None);
    }

    #[test]
    fn session_can_be_parsed_again_after_abort() {
        let parser = HtmlParser::new("x", CharEncoding::UTF8, HtmlParserOptions::default());
        parser.abort_parsing();
        let events = parser
            .parse(&mut Scripted::new(document(vec![Step::Text("x")]), 0))
            .unwrap();
        assert_eq!(events.len(), 3);
        assert!(parser.error().is_none());
        assert!(parser.sax_handler().error.is_some());
    }
}
