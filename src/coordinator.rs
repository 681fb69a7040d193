use crate::cache::ResponseCache;
use crate::config::AppConfig;
use crate::error::ProviderError;
use crate::fallback;
use crate::model::{
    Filters, Product, Provenance, RawResult, SearchQuery, SearchResult, SessionState, Severity,
};
use crate::normalize;
use crate::process;
use crate::provider::{self, ProductProvider};
use crate::retry::{FetchPlan, FetchStep, RetryPolicy};
use std::collections::BTreeMap;

/// Fire-and-forget sink for user-facing notices. The coordinator never
/// depends on the outcome of a notification.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _message: &str, _severity: Severity) {}
}

/// Writes notices to stderr so stdout stays clean for rendered results.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => eprintln!("{}", message),
            Severity::Warning => eprintln!("warning: {}", message),
            Severity::Error => eprintln!("error: {}", message),
        }
    }
}

/// Counters surfaced for the diagnostics view.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Keyed `provider:error_kind`.
    pub provider_failures: BTreeMap<String, u32>,
    pub last_error: Option<String>,
}

type ResultListener = Box<dyn Fn(&SessionState) + Send>;

enum FetchOutcome {
    Fetched(SearchResult),
    Exhausted,
}

/// Top-level state machine. Receives search/page/filter intents, drives
/// cache, providers, retry policy and the fallback generator, and exposes
/// the current view through `state()`.
///
/// All page and filter changes against an already-loaded result set are
/// synchronous and purely local; only genuine fetches touch the network.
pub struct SearchCoordinator {
    providers: Vec<Box<dyn ProductProvider>>,
    policy: RetryPolicy,
    cache: ResponseCache,
    state: SessionState,
    /// Bumped by every authoritative fetch; responses carrying an older
    /// epoch are discarded instead of overwriting newer state.
    epoch: u64,
    country: String,
    language: String,
    notifier: Box<dyn Notifier>,
    listener: Option<ResultListener>,
    provider_failures: BTreeMap<String, u32>,
    last_error: Option<String>,
}

impl SearchCoordinator {
    pub fn new(
        providers: Vec<Box<dyn ProductProvider>>,
        policy: RetryPolicy,
        cache: ResponseCache,
        country: &str,
        language: &str,
    ) -> Self {
        SearchCoordinator {
            providers,
            policy,
            cache,
            state: SessionState::default(),
            epoch: 0,
            country: country.to_lowercase(),
            language: language.to_lowercase(),
            notifier: Box::new(NullNotifier),
            listener: None,
            provider_failures: BTreeMap::new(),
            last_error: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let providers = provider::build_chain(config);
        if providers.is_empty() {
            tracing::warn!("No providers configured; every search will fall back to demo data");
        }
        let cache = ResponseCache::new(config.cache_ttl, config.cache_capacity, config.no_cache);
        Self::new(
            providers,
            config.retry_policy(),
            cache,
            &config.country,
            &config.language,
        )
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Register the presentation callback invoked after every view change.
    pub fn set_on_result_change(&mut self, listener: impl Fn(&SessionState) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let stats = self.cache.stats();
        Diagnostics {
            cache_hits: stats.hits,
            cache_misses: stats.misses,
            provider_failures: self.provider_failures.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Returns how many entries were dropped.
    pub fn clear_cache(&mut self) -> usize {
        let dropped = self.cache.len();
        self.cache.clear();
        dropped
    }

    pub async fn submit_search(&mut self, text: &str) {
        self.submit_search_opts(text, false).await;
    }

    pub async fn submit_search_opts(&mut self, text: &str, refresh: bool) {
        let query = SearchQuery::new(text, &self.country, &self.language);
        if query.text.is_empty() {
            return;
        }

        let same_query = self.state.last_query.as_ref() == Some(&query);
        if same_query && !self.state.all_results.is_empty() && !refresh {
            // We already hold the full set; this is just a page-1 view
            self.state.current_page = 1;
            self.reprocess();
            return;
        }

        if !same_query {
            // Reset, not destroy: filters survive a query change
            self.state.all_results.clear();
            self.state.visible_results.clear();
            self.state.degraded_mode = false;
            self.state.provenance = None;
            self.state.retry_attempt = 0;
        }
        self.state.last_query = Some(query.clone());
        self.state.current_page = 1;
        self.cache.invalidate_namespace(&query);

        let epoch = self.begin_fetch();
        let outcome = self.fetch(&query, 1).await;
        self.install(epoch, &query, outcome);
    }

    /// Page navigation over the loaded set is purely local. Requesting the
    /// current page is a no-op; out-of-range pages clamp. Only when no set
    /// is loaded does this turn into a fetch.
    pub async fn go_to_page(&mut self, n: u32) {
        if self.state.all_results.is_empty() {
            let Some(query) = self.state.last_query.clone() else {
                return;
            };
            let page = n.max(1);
            self.state.current_page = page;
            let epoch = self.begin_fetch();
            let outcome = self.fetch(&query, page).await;
            self.install(epoch, &query, outcome);
            return;
        }
        if n == self.state.current_page {
            return;
        }
        self.state.current_page = n;
        self.reprocess();
    }

    /// In-memory filters (price, rating, brand, source, sort) reprocess the
    /// loaded set locally. Synchronous by design so an in-flight fetch for
    /// another query can never block a filter change.
    pub fn set_filters(&mut self, filters: Filters) {
        if filters == self.state.filters {
            return;
        }
        self.state.filters = filters;
        self.reprocess();
    }

    /// Country or language changes alter upstream semantics: the active
    /// query's cache namespace is dropped and the search rerun at page 1.
    pub async fn set_market(&mut self, country: &str, language: &str) {
        let country = country.to_lowercase();
        let language = language.to_lowercase();
        if country == self.country && language == self.language {
            return;
        }
        if let Some(prev) = self.state.last_query.clone() {
            self.cache.invalidate_namespace(&prev);
        }
        self.country = country;
        self.language = language;
        if let Some(prev) = self.state.last_query.clone() {
            self.submit_search_opts(&prev.text, true).await;
        }
    }

    pub async fn retry_last_search(&mut self) {
        let Some(query) = self.state.last_query.clone() else {
            return;
        };
        self.state.retry_attempt += 1;
        self.submit_search_opts(&query.text, true).await;
    }

    fn begin_fetch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Cache first, then the provider chain under the retry policy. The
    /// adapters never decide on fallback; exhaustion is reported upward.
    async fn fetch(&mut self, query: &SearchQuery, page: u32) -> FetchOutcome {
        if let Some(mut hit) = self.cache.get(query, page) {
            tracing::debug!(
                "Serving page {}/{} from cache ({} of {} upstream items)",
                page,
                hit.total_pages,
                hit.products.len(),
                hit.total_count
            );
            hit.provenance = Provenance::Cached;
            return FetchOutcome::Fetched(hit);
        }

        let mut plan = FetchPlan::new(self.policy.clone(), self.providers.len());
        loop {
            match plan.next_step() {
                FetchStep::Exhausted => return FetchOutcome::Exhausted,
                FetchStep::Attempt {
                    adapter,
                    attempt,
                    delay,
                } => {
                    let name = self.providers[adapter].name();
                    if !self.providers[adapter].is_available() {
                        tracing::debug!("Skipping unavailable provider {}", name);
                        plan.advance_adapter();
                        continue;
                    }
                    if let Some(d) = delay {
                        tracing::info!(
                            "Retrying {} in {:?} (attempt {}/{})",
                            name,
                            d,
                            attempt,
                            self.policy.max_attempts
                        );
                        self.notifier.notify(
                            &format!(
                                "{} failed, retrying (attempt {} of {})",
                                name, attempt, self.policy.max_attempts
                            ),
                            Severity::Info,
                        );
                        tokio::time::sleep(d).await;
                    }
                    let result = self.providers[adapter].search(query, page).await;
                    match result {
                        Ok(raw) => {
                            tracing::info!("{} returned {} items", name, raw.items.len());
                            let assembled = self.assemble(query, raw, name);
                            self.cache.put(query, page, assembled.clone());
                            return FetchOutcome::Fetched(assembled);
                        }
                        Err(e) => {
                            self.record_provider_failure(name, &e, attempt);
                            plan.record_failure(&e);
                        }
                    }
                }
            }
        }
    }

    fn assemble(&self, query: &SearchQuery, raw: RawResult, provider_name: &str) -> SearchResult {
        let products: Vec<Product> = raw
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| normalize::normalize(item, i, query))
            .collect();
        let local_count = products.len() as u32;
        // The upstream total may exceed what we hold; it only ever informs
        // the display count, never the local page math.
        let total_count = raw.total_count.unwrap_or(local_count).max(local_count);
        let mut provider_diagnostics = raw.diagnostics;
        provider_diagnostics.insert("provider".to_string(), provider_name.to_string());
        SearchResult {
            total_pages: process::total_pages(products.len()),
            products,
            total_count,
            provenance: Provenance::Live,
            provider_diagnostics,
        }
    }

    /// Commit a fetch outcome to the session, unless a newer search has
    /// been submitted in the meantime; stale responses are discarded so the
    /// most recent query stays authoritative.
    fn install(&mut self, epoch: u64, query: &SearchQuery, outcome: FetchOutcome) {
        if epoch != self.epoch || self.state.last_query.as_ref() != Some(query) {
            tracing::debug!("Discarding stale response for '{}'", query.text);
            return;
        }
        match outcome {
            FetchOutcome::Fetched(result) => {
                if let Some(provider) = result.provider_diagnostics.get("provider") {
                    tracing::debug!("Installing results from {}", provider);
                }
                self.state.provenance = Some(result.provenance);
                self.state.degraded_mode = false;
                self.state.all_results = result.products;
            }
            FetchOutcome::Exhausted => {
                self.state.all_results = fallback::generate(query);
                self.state.provenance = Some(Provenance::Demo);
                self.state.degraded_mode = true;
                self.notifier.notify(
                    "All providers failed; showing demonstration data",
                    Severity::Warning,
                );
            }
        }
        self.reprocess();
    }

    /// The one place visible results and page counts are derived. Always
    /// recomputes `total_pages` from the set we actually hold.
    fn reprocess(&mut self) {
        let processed = process::apply(
            &self.state.all_results,
            &self.state.filters,
            self.state.current_page.max(1),
        );
        tracing::debug!(
            "{} of {} results match the active filters",
            processed.filtered_count,
            self.state.all_results.len()
        );
        self.state.current_page = processed.page;
        self.state.total_pages = processed.total_pages;
        self.state.visible_results = processed.visible;
        if let Some(listener) = &self.listener {
            listener(&self.state);
        }
    }

    fn record_provider_failure(&mut self, name: &str, err: &ProviderError, attempt: u32) {
        tracing::warn!("{} attempt {} failed: {}", name, attempt, err);
        *self
            .provider_failures
            .entry(format!("{}:{}", name, err.kind()))
            .or_insert(0) += 1;
        self.last_error = Some(format!("{}: {}", name, err));

        if err.is_configuration_problem() {
            self.notifier.notify(
                &format!("{} is misconfigured: {}. Check your keys and policy settings", name, err),
                Severity::Error,
            );
        } else if let ProviderError::RateLimit {
            retry_after_secs: Some(secs),
        } = err
        {
            self.notifier.notify(
                &format!("{} is rate limited, try again in {}s", name, secs),
                Severity::Warning,
            );
        }
    }
}
