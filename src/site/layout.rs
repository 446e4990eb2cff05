//! Page layout with typed variable injection.

use std::marker::PhantomData;

use crate::utils::html::escape;

/// A variable set that knows how to fill its template.
pub trait TemplateVars {
    fn apply(&self, content: &str) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct Template<V> {
    content: &'static str,
    _marker: PhantomData<V>,
}

impl<V> Template<V> {
    pub const fn new(content: &'static str) -> Self {
        Self {
            content,
            _marker: PhantomData,
        }
    }
}

impl<V: TemplateVars> Template<V> {
    pub fn render(&self, vars: &V) -> String {
        vars.apply(self.content)
    }
}

pub struct PageVars<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

impl TemplateVars for PageVars<'_> {
    fn apply(&self, content: &str) -> String {
        // Body last: it may itself contain `__TITLE__`
        content
            .replace("__TITLE__", &escape(self.title))
            .replacen("__BODY__", self.body, 1)
    }
}

const PAGE_HTML: &str = "<!DOCTYPE html>\n\
     <html>\n\
     <head>\n\
     <meta charset=\"utf-8\">\n\
     <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
     <title>__TITLE__</title>\n\
     </head>\n\
     <body>\n\
     __BODY__\n\
     </body>\n\
     </html>\n";

/// Wrap rendered document HTML in a full page.
pub fn page(title: &str, body: &str) -> String {
    Template::new(PAGE_HTML).render(&PageVars { title, body })
}
