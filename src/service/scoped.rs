//! Module-scoped view of the routing service
//!
//! Each module obtains its own view; every record logged through it carries
//! the module identity and lands on the channel named after the module.

use super::handle::{LogCall, LoggerHandle};
use super::routing::RoutingService;
use crate::config::ConfigProperties;
use crate::core::{LogLevel, ModuleId};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Qualifier stamped on records logged through a [`ModuleLogService`]
pub const MODULE_QUALIFIER: &str = "rust_logging_service::ModuleLogService";

/// Legacy-code log service bound to one module
#[derive(Clone)]
pub struct ModuleLogService {
    service: Arc<RoutingService>,
    module: ModuleId,
}

impl ModuleLogService {
    pub fn new(service: Arc<RoutingService>, module: ModuleId) -> Self {
        Self { service, module }
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    pub fn log(&self, code: i32, message: &str) {
        self.log_from(None, code, message, None);
    }

    pub fn log_with_cause(&self, code: i32, message: &str, cause: &(dyn Error + 'static)) {
        self.log_from(None, code, message, Some(cause));
    }

    /// Log on behalf of `origin`, a description of the object the call
    /// concerns. The origin travels with the posted event.
    pub fn log_from(
        &self,
        origin: Option<&str>,
        code: i32,
        message: &str,
        cause: Option<&(dyn Error + 'static)>,
    ) {
        let call = LogCall {
            cause,
            module: Some(&self.module),
            qualifier: MODULE_QUALIFIER,
            origin,
            ..LogCall::new(
                &self.module.symbolic_name,
                LogLevel::from_legacy_code(code),
                message,
            )
        };
        self.service.route_call(call);
    }

    /// Named handle stamping this module on its records
    pub fn get_logger(&self, channel: &str) -> LoggerHandle {
        self.service
            .get_logger(channel)
            .with_module(self.module.clone())
    }

    pub fn legacy_log_level(&self) -> i32 {
        self.service.legacy_log_level()
    }

    pub fn is_enabled(&self, code: i32) -> bool {
        self.service
            .is_enabled(&self.module.symbolic_name, LogLevel::from_legacy_code(code))
    }

    /// Forward a configuration snapshot to the shared service
    pub fn updated(&self, configuration: Option<&ConfigProperties>) {
        self.service.updated(configuration);
    }
}

impl fmt::Debug for ModuleLogService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLogService")
            .field("module", &self.module)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StatusLogger, LEGACY_ERROR, LEGACY_INFO, LEGACY_WARNING};
    use crate::service::{LogEvent, LogEventHandler};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Events(Mutex<Vec<(String, Option<String>, Option<u64>)>>);

    impl LogEventHandler for Events {
        fn handle_event(&self, event: &LogEvent) {
            self.0.lock().push((
                event.topic.to_string(),
                event.origin.clone(),
                event.module.as_ref().map(|m| m.id),
            ));
        }
    }

    fn service() -> Arc<RoutingService> {
        RoutingService::builder()
            .status(Arc::new(StatusLogger::quiet()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_records_carry_module() {
        let service = service();
        let scoped = service.scoped(ModuleId::new(12, "com.acme.inventory"));

        scoped.log(LEGACY_WARNING, "stock low");
        scoped.log(LEGACY_INFO + 1, "debug is filtered");

        let entries = service.history().entries();
        assert_eq!(entries.len(), 1);
        let record = &entries[0].record;
        assert_eq!(record.channel, "com.acme.inventory");
        assert_eq!(record.level, LogLevel::Warn);
        assert_eq!(record.qualifier, MODULE_QUALIFIER);
        assert_eq!(record.module.as_ref().unwrap().id, 12);
    }

    #[test]
    fn test_origin_reaches_events() {
        let service = service();
        let events = Arc::new(Events::default());
        service.events().unwrap().subscribe(events.clone());

        let scoped = service.scoped(ModuleId::new(5, "com.acme.http"));
        let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timeout");
        scoped.log_from(Some("endpoint /orders"), LEGACY_ERROR, "request failed", Some(&err));

        service.shutdown();
        assert_eq!(
            *events.0.lock(),
            vec![(
                "log/entry/LOG_ERROR".to_string(),
                Some("endpoint /orders".to_string()),
                Some(5)
            )]
        );
    }

    #[test]
    fn test_scoped_loggers_and_levels() {
        let service = service();
        let scoped = service.scoped(ModuleId::new(8, "com.acme.mail"));

        let logger = scoped.get_logger("com.acme.mail.smtp");
        logger.error("relay refused");
        assert_eq!(service.history().entries()[0].module().unwrap().id, 8);

        assert_eq!(scoped.legacy_log_level(), LEGACY_INFO);
        assert!(scoped.is_enabled(LEGACY_INFO));
        assert!(!scoped.is_enabled(LEGACY_INFO + 1));
    }
}
