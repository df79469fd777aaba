#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use askpdf::{
    api,
    chat::{ChatClient, ChatClientError, ChatRequest},
    embedding::{EmbeddingClient, EmbeddingClientError, EmbeddingInput},
    processing::{PdfExtractor, RagService},
    store::SessionStore,
};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, header},
    response::Response,
};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

pub const BOUNDARY: &str = "askpdf-integration-boundary";
const DIMENSION: usize = 64;

/// Hashes lowercase words into a fixed-size bag-of-words vector.
pub struct WordHashEmbedding;

impl WordHashEmbedding {
    fn embed(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            let slot = word
                .to_lowercase()
                .bytes()
                .fold(17usize, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as usize))
                % DIMENSION;
            vector[slot] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingClient for WordHashEmbedding {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
        _input: EmbeddingInput,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        Ok(texts.iter().map(|text| Self::embed(text)).collect())
    }

    fn model(&self) -> &str {
        "word-hash"
    }
}

/// Summarizes by quoting the prompt context and answers by echoing retrieved context.
#[derive(Default)]
pub struct EchoChat {
    pub requests: Mutex<Vec<ChatRequest>>,
}

#[async_trait]
impl ChatClient for EchoChat {
    async fn complete(&self, request: ChatRequest) -> Result<String, ChatClientError> {
        self.requests
            .lock()
            .expect("lock")
            .push(request.clone());
        let prompt = request.prompt;
        if let Some((_, context)) = prompt.split_once("Initial Text:\n") {
            return Ok(format!("This document discusses: {}", context.trim()));
        }
        let context = prompt
            .split_once("Context:\n")
            .and_then(|(_, rest)| rest.split_once("\n\nQuestion:"))
            .map(|(context, _)| context.to_string())
            .ok_or_else(|| ChatClientError::InvalidResponse("unexpected prompt".into()))?;
        Ok(format!("From the document: {context}"))
    }
}

pub struct TestApp {
    pub router: Router,
    pub chat: Arc<EchoChat>,
    pub store_dir: tempfile::TempDir,
    pub scratch_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let store_dir = tempfile::tempdir().expect("store dir");
        let scratch_dir = tempfile::tempdir().expect("scratch dir");
        let store = SessionStore::open(store_dir.path()).await.expect("store");
        let chat = Arc::new(EchoChat::default());
        let service = RagService::new(Arc::new(WordHashEmbedding), chat.clone(), store)
            .with_extractor(PdfExtractor::with_scratch_dir(scratch_dir.path()));
        let router = api::create_router(Arc::new(service), 10 * 1024 * 1024);
        Self {
            router,
            chat,
            store_dir,
            scratch_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        use tower::ServiceExt;
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    pub fn session_dirs(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.store_dir.path())
            .expect("read store")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn upload_request(filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

pub fn query_request(session_id: &str, query: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "session_id": session_id, "query": query }).to_string(),
        ))
        .expect("request")
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Build a PDF with one line of Courier text per page. Page bytes are WinAnsi-encoded.
pub fn pdf_with_pages<T: AsRef<[u8]>>(pages: &[T]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text.as_ref())]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id =
            doc.add_object(Stream::new(dictionary! {}, content.encode().expect("encode")));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}
