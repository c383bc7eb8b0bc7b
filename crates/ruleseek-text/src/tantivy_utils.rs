use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{Language, LowerCaser, SimpleTokenizer, Stemmer, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "stemmed_en";

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    let _id_field = schema_builder.add_text_field("id", STRING | STORED);
    let _source_field = schema_builder.add_text_field("source", STRING | STORED);
    let _seq_field = schema_builder.add_u64_field("seq", STORED);
    let text_field_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
    let _text_field = schema_builder.add_text_field("text", text_options);
    schema_builder.build()
}

/// Lowercase + Porter-style English stemming, so "drop" matches
/// "dropping". Stop words are handled at query time, where question words
/// are deliberately kept.
pub fn register_tokenizer(index: &Index) {
    let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(Stemmer::new(Language::English))
        .build();
    index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
