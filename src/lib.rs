pub mod core;
pub mod analysis;
pub mod index;
pub mod scoring;
pub mod query;
pub mod search;
pub mod feedback;
pub mod letor;
pub mod diversify;

/*
┌────────────────────────────────────────────────────────────────────────────────────────────┐
│                             QUARRY STRUCT ARCHITECTURE                                      │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────────── CORE LAYER ──────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────┐  ┌────────────────────────────────────────┐    │
│  │ struct SearchConfig                    │  │ struct Error                           │    │
│  │ • default_field: String                │  │ • kind: ErrorKind                      │    │
│  │ • output_length: usize                 │  │ • context: String                      │    │
│  │ • run_id: String                       │  │                                        │    │
│  │ • model: RetrievalModel                │  │ enum ErrorKind                         │    │
│  │ • expansion: Option<ExpansionParams>   │  │ • Parse / MalformedQuery               │    │
│  │ • diversity: Option<DiversifyParams>   │  │ • UnsupportedOperator                  │    │
│  └────────────────────────────────────────┘  │ • InvalidArgument / InvalidState       │    │
│                                               │ • Io / NotFound                        │    │
│  ┌──────────────────┐                        └────────────────────────────────────────┘    │
│  │ struct DocId     │                                                                        │
│  │ • 0: u32         │                                                                        │
│  └──────────────────┘                                                                        │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────────── ANALYSIS LAYER ────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │                               struct Analyzer                                       │    │
│  │  ┌──────────────────────────────────────────────────────────────────────────────┐ │    │
│  │  │ tokenizer: Box<dyn Tokenizer>     // Unicode word segmentation               │ │    │
│  │  │ filters: Vec<Box<dyn TokenFilter>>// Lowercase → Stopword → Stemmer          │ │    │
│  │  └──────────────────────────────────────────────────────────────────────────────┘ │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                              │
│  ┌──────────────────────────┐  ┌───────────────────────┐  ┌─────────────────────────┐      │
│  │ struct StandardTokenizer │  │ struct StopWordFilter │  │ struct StemmerFilter    │      │
│  │ • max_token_length       │  │ • stop_words: HashSet │  │ • rust_stemmers porter2 │      │
│  └──────────────────────────┘  └───────────────────────┘  └─────────────────────────┘      │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── INDEX LAYER ──────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │                         trait IndexReader (Send + Sync)                             │    │
│  │  ┌──────────────────────────────────────────────────────────────────────────────┐ │    │
│  │  │ inverted_list(field, term)        // positional postings                     │ │    │
│  │  │ term_vector(doc, field)           // forward view for feedback/features     │ │    │
│  │  │ num_docs / doc_count / field_length / sum_of_field_lengths                  │ │    │
│  │  │ internal_docid / external_docid / attribute                                 │ │    │
│  │  └──────────────────────────────────────────────────────────────────────────────┘ │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                              │
│  ┌──────────────────────┐  ┌──────────────────────┐  ┌──────────────────────────────┐      │
│  │ struct MemoryIndex   │  │ struct InvList       │  │ struct Posting               │      │
│  │ • postings per field │  │ • field: String      │  │ • doc_id: DocId              │      │
│  │ • term vectors       │  │ • df() / ctf()       │  │ • positions: Vec<u32>        │      │
│  │ • attributes         │  │ • postings: Vec<_>   │  └──────────────────────────────┘      │
│  └──────────────────────┘  └──────────────────────┘                                         │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── QUERY + SCORING LAYER ────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │ struct QueryParser                    // nom grammar over #op/k ( ... ) trees      │    │
│  │ • analyzer / default_field / fields   // terms analyzed, .field suffixes resolved  │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                              │
│  ┌────────────────────────────────────┐  ┌────────────────────────────────────────┐        │
│  │ struct QryIop (inverted-list ops)  │  │ struct QrySop (score ops)              │        │
│  │ • kind: Term | Near | Window       │  │ • kind: Score | And | Or | Sum         │        │
│  │ • field: String                    │  │         | Wand | Wsum                  │        │
│  │ • evaluated InvList + cursors      │  │ • doc iterator + match cache           │        │
│  └────────────────────────────────────┘  └────────────────────────────────────────┘        │
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │ enum RetrievalModel                                                                 │    │
│  │ • UnrankedBoolean / RankedBoolean     // set semantics, match-all                  │    │
│  │ • Bm25(Bm25Params { k1, b, k3 })      // tf/idf ranking, match-min                 │    │
│  │ • Indri(IndriParams { mu, lambda })   // language model, default scores            │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── SEARCH + RERANKING LAYER ─────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │ struct QueryExecutor                                                                │    │
│  │ • index: Arc<dyn IndexReader>         // shared, read-only                         │    │
│  │ • parser: QueryParser                                                              │    │
│  │ • config: SearchConfig                // model, lengths, optional sections         │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                              │
│  ┌──────────────────────┐  ┌───────────────────────────┐  ┌─────────────────────────┐      │
│  │ struct ScoreList     │  │ struct ExpansionParams    │  │ struct DiversifyParams  │      │
│  │ • entries: Vec<_>    │  │ • Indri PRF → #wand query │  │ • xQuAD / PM-2          │      │
│  │ • sort / truncate    │  └───────────────────────────┘  └─────────────────────────┘      │
│  └──────────────────────┘                                                                   │
│                                                                                              │
│  ┌────────────────────────────────────────┐  ┌────────────────────────────────────┐        │
│  │ struct FeatureExtractor                │  │ search::trec                       │        │
│  │ • 20 ranking features → SVMrank lines  │  │ • ranked-run output writer         │        │
│  └────────────────────────────────────────┘  └────────────────────────────────────┘        │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

DESIGN NOTES

1. The operator tree is the query plan. Parsing produces QrySop/QryIop trees
   directly; there is no separate planner. Score operators drive a document
   iterator protocol (has_match / get_match / advance_past), inverted-list
   operators additionally expose location iterators over positions. NEAR and
   WINDOW materialize a derived InvList when the tree is initialized, so a
   positional operator looks exactly like a term to everything above it.

2. Match semantics follow the model. Boolean models intersect (match-all);
   BM25 and Indri visit any document a child matches (match-min) and Indri
   fills the gaps with collection-statistics default scores.

3. Readers are immutable. All per-query state, including iterator cursors
   and cached matches, lives in the operator tree, so one Arc'd index serves
   any number of concurrent queries.

4. Reranking is layered over retrieval, not into it. Feedback rewrites the
   query text and retrieves again; LeToR extracts features from rankings and
   re-orders with external model scores; diversification re-ranks against
   intent rankings. None of them touch the operator tree.
*/
