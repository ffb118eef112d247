pub mod budget;
pub mod compliance;
pub mod config;
pub mod dependency;
pub mod error;
pub mod export;
pub mod export_gate;
pub mod model;
pub mod review;
pub mod risk;
pub mod rules;
pub mod scoring;
pub mod section;
pub mod text;

pub use budget::{BudgetIssue, BudgetState, BudgetSummary, CostCategory, DirectCostItem, Personnel};
pub use compliance::{ChecklistItem, ComplianceIssue, ComplianceReport};
pub use config::{
    ConfigManager, IntegrationsConfig, LlmConfig, LlmProviderKind, LoggingConfig, SecretsConfig,
    SecurityConfig, ServerConfig, Settings,
};
pub use dependency::{DependencyEdge, DependencyGraph};
pub use error::{GrantError, Result};
pub use export::ExportFormat;
pub use export_gate::{ExportDecision, GateItem, GateSource};
pub use model::{
    Aim, Application, ApplicationId, ApplicationStatus, ArchitectureData, Attachment, Reference,
    Severity, UserId, VerificationResult,
};
pub use review::{DocumentReview, SectionReview};
pub use risk::{RiskFlag, RiskLevel, RiskReport, RiskSeverity};
pub use rules::{MechanismId, MechanismRules, SectionLimit};
pub use scoring::{SectionScore, StructuralScore};
pub use section::{Section, SectionType};
