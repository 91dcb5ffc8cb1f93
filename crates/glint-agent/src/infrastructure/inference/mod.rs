//! Inference adapters.
//!
//! [`gemini::GeminiProvider`] implements
//! [`InferenceProvider`](crate::application::rotate_credentials::InferenceProvider)
//! over the Gemini `generateContent` REST endpoint.  Screenshots arrive
//! already PNG-encoded; the adapter only wraps them in base64.

pub mod gemini;
