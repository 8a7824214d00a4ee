// Pipeline phases for architecture mapping
//
// Each phase is self-contained with its own prompt builder, classifier call
// and deterministic fallback.

pub mod llm_helper;

#[path = "01_scan.rs"]
pub mod scan;
#[path = "02_detect.rs"]
pub mod detect;
#[path = "03_relate.rs"]
pub mod relate;
#[path = "04_render.rs"]
pub mod render;
