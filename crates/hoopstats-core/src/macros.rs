/// Compile a CSS selector once and hand out a `&'static Selector`.
///
/// Only ever used with literal selectors, so a parse failure is a programming
/// error caught by the first test that touches it.
macro_rules! selector {
    ($e: expr) => {{
        use ::once_cell::sync::Lazy;
        use ::scraper::Selector;
        static SELECTOR: Lazy<Selector> =
            Lazy::new(|| Selector::parse($e).expect("static selector must parse"));
        &*SELECTOR
    }};
}
