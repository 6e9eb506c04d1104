//! Insight data models
//!
//! The analysis payload is produced by the AI service and stored verbatim as
//! JSON; every field is optional so a partially-conforming model response
//! still round-trips.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Insight database model - one stored analysis per resume/JD pair
#[derive(FromRow, Debug, Clone)]
pub struct Insight {
    pub id: String,
    pub user_id: String,
    pub job_title: String,
    pub resume_filename: Option<String>,
    pub match_score: Option<f64>,
    pub ats_score: Option<f64>,
    pub analysis_result: String,
    pub created_at: Option<String>,
}

/// Structured analysis output expected from the AI service
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub match_score: Option<f64>,
    pub ats_score: Option<f64>,
    pub fluff_analysis: Option<FluffAnalysis>,
    pub role_fit_and_alignment_metrics: Option<RoleFitAndAlignmentMetrics>,
    pub keyword_analysis: Option<KeywordAnalysis>,
    pub resume_suggestions: Option<Vec<String>>,
    pub interview_preparation_topics: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FluffAnalysis {
    pub summary: Option<String>,
    pub detected: Option<Vec<FluffItem>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FluffItem {
    pub original: Option<String>,
    pub suggestion: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoleFitAndAlignmentMetrics {
    pub prediction: Option<FitPrediction>,
    pub radar_data: Option<RadarData>,
    pub alignment_breakdown: Option<AlignmentBreakdown>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FitPrediction {
    pub verdict: Option<String>,
    pub reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RadarData {
    pub technical_skills: Option<f64>,
    pub soft_skills: Option<f64>,
    pub experience_level: Option<f64>,
    pub culture_fit: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentBreakdown {
    pub skills: Option<f64>,
    pub experience: Option<f64>,
    pub education: Option<f64>,
    pub keywords: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct KeywordAnalysis {
    pub matched_keywords: Option<Vec<String>>,
    pub missing_keywords: Option<Vec<String>>,
    pub keyword_density_score: Option<f64>,
}

/// Full insight payload returned by process and by-id endpoints
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InsightDetail {
    pub id: String,
    pub job_title: String,
    pub resume_filename: Option<String>,
    pub created_at: Option<String>,
    pub match_score: Option<f64>,
    pub ats_score: Option<f64>,
    pub analysis_result: AnalysisResult,
}

/// Compact listing entry for the history endpoint
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InsightSummary {
    pub id: String,
    pub job_title: String,
    pub analysis_date: Option<String>,
    pub match_score: Option<f64>,
    pub ats_score: Option<f64>,
    pub resume_filename: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LatestInsightResponse {
    pub latest_insight_id: Option<String>,
}

impl From<Insight> for InsightSummary {
    fn from(row: Insight) -> Self {
        InsightSummary {
            id: row.id,
            job_title: row.job_title,
            analysis_date: row.created_at,
            match_score: row.match_score,
            ats_score: row.ats_score,
            resume_filename: row.resume_filename,
        }
    }
}
