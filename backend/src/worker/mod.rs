pub mod report_worker;

pub use report_worker::{RenderQueue, ReportJob, ReportRenderer, TokioRenderQueue};
