//! `url()` visitors.

use lightningcss::values::url::Url;
use lightningcss::visitor::{VisitTypes, Visitor};
use rustc_hash::FxHashMap;
use std::convert::Infallible;

/// Records every `url()` argument in visit order.
#[derive(Debug, Default)]
pub(super) struct UrlCollector {
    pub urls: Vec<String>,
}

impl<'i> Visitor<'i> for UrlCollector {
    type Error = Infallible;

    fn visit_types(&self) -> VisitTypes {
        lightningcss::visit_types!(URLS)
    }

    fn visit_url(&mut self, url: &mut Url<'i>) -> Result<(), Self::Error> {
        self.urls.push(url.url.to_string());
        Ok(())
    }
}

/// Replaces `url()` arguments found in `renamed`; leaves the rest alone.
///
/// Quoting is decided by the printer, which quotes only when the new URL
/// needs it.
pub(super) struct UrlRewriter<'a> {
    renamed: &'a FxHashMap<String, String>,
}

impl<'a> UrlRewriter<'a> {
    pub fn new(renamed: &'a FxHashMap<String, String>) -> Self {
        Self { renamed }
    }
}

impl<'i> Visitor<'i> for UrlRewriter<'_> {
    type Error = Infallible;

    fn visit_types(&self) -> VisitTypes {
        lightningcss::visit_types!(URLS)
    }

    fn visit_url(&mut self, url: &mut Url<'i>) -> Result<(), Self::Error> {
        if let Some(renamed) = self.renamed.get(url.url.as_ref()) {
            url.url = renamed.clone().into();
        }
        Ok(())
    }
}
