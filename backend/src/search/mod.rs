//! Tantivy-based search index module.
//!
//! Full-text search over job postings with per-field boosting.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::JobPosting;

/// Field boost values.
const BOOST_TITLE: f32 = 10.0;
const BOOST_SKILLS: f32 = 8.0;
const BOOST_COMPANY: f32 = 6.0;
const BOOST_LOCATION: f32 = 4.0;
const BOOST_DESCRIPTION: f32 = 3.0;

/// Search hit with relevance score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub job_id: String,
    pub score: f32,
}

struct SearchFields {
    job_id: Field,
    title: Field,
    company: Field,
    location: Field,
    description: Field,
    skills: Field,
}

impl SearchFields {
    fn boosted(&self) -> [(Field, f32); 5] {
        [
            (self.title, BOOST_TITLE),
            (self.skills, BOOST_SKILLS),
            (self.company, BOOST_COMPANY),
            (self.location, BOOST_LOCATION),
            (self.description, BOOST_DESCRIPTION),
        ]
    }
}

/// Tantivy search index for job postings.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        let job_id = schema_builder.add_text_field("job_id", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT);
        let company = schema_builder.add_text_field("company", TEXT);
        let location = schema_builder.add_text_field("location", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let skills = schema_builder.add_text_field("skills", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            job_id,
            title,
            company,
            location,
            description,
            skills,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000)
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from the given jobs.
    pub async fn rebuild(&self, jobs: &[JobPosting]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for job in jobs {
            writer.add_document(self.document(job))?;
        }
        writer.commit()?;
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} jobs", jobs.len());
        Ok(())
    }

    /// Index or re-index a single job.
    pub async fn index_job(&self, job: &JobPosting) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.job_id, &job.id));
        writer.add_document(self.document(job))?;
        writer.commit()?;
        self.reader.reload()?;

        Ok(())
    }

    /// Remove a job from the index.
    pub async fn remove_job(&self, job_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(Term::from_field_text(self.fields.job_id, job_id));
        writer.commit()?;
        self.reader.reload()?;

        Ok(())
    }

    /// Search for jobs matching the query. Blank queries match nothing.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in self.fields.boosted() {
            let parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        if subqueries.is_empty() {
            return Err(AppError::Search(format!(
                "Invalid search query: {}",
                query_str
            )));
        }
        let query = BooleanQuery::new(subqueries);

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit + offset))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let hits = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, address)| {
                let doc: TantivyDocument = searcher.doc(address).ok()?;
                let job_id = doc.get_first(self.fields.job_id)?.as_str()?.to_string();
                Some(SearchHit { job_id, score })
            })
            .collect();

        Ok(hits)
    }

    fn document(&self, job: &JobPosting) -> TantivyDocument {
        doc!(
            self.fields.job_id => job.id.clone(),
            self.fields.title => job.title.clone(),
            self.fields.company => job.company.clone(),
            self.fields.location => job.location.clone().unwrap_or_default(),
            self.fields.description => job.description.clone(),
            self.fields.skills => job.skills.join(" ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn job(id: &str, title: &str, company: &str, skills: &[&str]) -> JobPosting {
        JobPosting {
            id: id.to_string(),
            title: title.to_string(),
            company: company.to_string(),
            location: Some("Remote".to_string()),
            description: "Join a small product team".to_string(),
            job_type: None,
            salary: None,
            contact_email: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            created_at: "2025-09-15T12:00:00.000000Z".to_string(),
            updated_at: "2025-09-15T12:00:00.000000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_title_and_skill_matches() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        index
            .rebuild(&[
                job("1", "Frontend Engineer", "Arcadia Labs", &["React", "TypeScript"]),
                job("2", "Data Engineer", "DataForge", &["Python", "dbt"]),
            ])
            .await
            .unwrap();

        let hits = index.search("typescript", 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].job_id, "1");

        let hits = index.search("engineer", 10, 0).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_and_reindex() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        index
            .index_job(&job("1", "Platform Engineer", "Nimbus Cloud", &[]))
            .await
            .unwrap();
        index
            .index_job(&job("1", "Platform Lead", "Nimbus Cloud", &[]))
            .await
            .unwrap();
        assert_eq!(index.search("nimbus", 10, 0).unwrap().len(), 1);
        assert!(index.search("engineer", 10, 0).unwrap().is_empty());

        index.remove_job("1").await.unwrap();
        assert!(index.search("nimbus", 10, 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_query() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        assert!(index.search("  ", 10, 0).unwrap().is_empty());
    }
}
