//! Versioned vocabulary tables backing the query builder, domain gate,
//! and evidence classifier.
//!
//! Every keyword heuristic in the pipeline reads from these tables; no
//! stage carries inline term literals. Bump `VOCAB_VERSION` when editing
//! so ranking changes are attributable in logs.

pub const VOCAB_VERSION: &str = "2024-06";

/// Terms counted by the domain gate. A candidate whose title+abstract
/// contain fewer than the profile's minimum of these (and no query-term
/// override in the title) is excluded from ranking entirely.
pub const DOMAIN_TERMS: &[&str] = &[
    // Clinical research vocabulary
    "patient", "patients", "clinical", "treatment", "therapy", "therapeutic",
    "diagnosis", "diagnostic", "prognosis", "disease", "disorder", "syndrome",
    "symptom", "symptoms", "medical", "medicine", "health", "healthcare",
    "hospital", "physician", "nurse", "intervention", "outcome", "outcomes",
    "mortality", "morbidity", "survival", "efficacy", "safety", "adverse",
    "placebo", "randomized", "randomised", "trial", "cohort", "prospective",
    "retrospective", "incidence", "prevalence", "epidemiology", "etiology",
    "pathogenesis", "pathology", "screening", "prevention", "vaccination",
    "vaccine", "immunization",
    // Pharmacology
    "drug", "drugs", "dose", "dosage", "dosing", "pharmacokinetics",
    "pharmacodynamics", "pharmacology", "medication", "prescribed",
    "prescription", "inhibitor", "agonist", "antagonist", "receptor",
    "antibiotic", "antiviral", "chemotherapy", "immunotherapy",
    // Body systems and common conditions
    "cardiovascular", "cardiac", "coronary", "hypertension", "diabetes",
    "diabetic", "insulin", "glucose", "glycemic", "oncology", "cancer",
    "tumor", "tumour", "carcinoma", "metastasis", "neoplasm", "lymphoma",
    "leukemia", "stroke", "ischemia", "ischemic", "infarction", "renal",
    "hepatic", "pulmonary", "respiratory", "asthma", "copd", "pneumonia",
    "infection", "sepsis", "inflammatory", "inflammation", "autoimmune",
    "arthritis", "osteoporosis", "neurological", "neurology", "alzheimer",
    "dementia", "parkinson", "epilepsy", "migraine", "depression", "anxiety",
    "psychiatric", "obesity", "metabolic", "lipid", "cholesterol",
    "thrombosis", "anticoagulant", "hemorrhage", "anemia", "transplant",
    "dialysis", "biopsy", "lesion", "gastrointestinal", "dermatology",
    "pediatric", "geriatric", "obstetric", "pregnancy", "neonatal",
];

/// Per-concept synonym expansions used to raise recall. At most
/// `MAX_ALTERNATES_PER_CONCEPT` alternates are taken per matched concept
/// so expansion never dilutes the query.
pub const SYNONYMS: &[(&str, &[&str])] = &[
    ("heart attack", &["myocardial infarction", "acute coronary syndrome"]),
    ("myocardial infarction", &["heart attack", "acute coronary syndrome"]),
    ("high blood pressure", &["hypertension"]),
    ("hypertension", &["high blood pressure", "elevated blood pressure"]),
    ("stroke", &["cerebrovascular accident", "cerebral infarction"]),
    ("diabetes", &["diabetes mellitus", "hyperglycemia"]),
    ("cancer", &["neoplasm", "malignancy", "carcinoma"]),
    ("kidney disease", &["renal disease", "nephropathy"]),
    ("kidney failure", &["renal failure", "end-stage renal disease"]),
    ("liver disease", &["hepatic disease", "hepatopathy"]),
    ("heart failure", &["cardiac failure", "congestive heart failure"]),
    ("atrial fibrillation", &["afib", "auricular fibrillation"]),
    ("high cholesterol", &["hypercholesterolemia", "dyslipidemia"]),
    ("blood thinner", &["anticoagulant", "antithrombotic"]),
    ("painkiller", &["analgesic"]),
    ("depression", &["major depressive disorder", "depressive disorder"]),
    ("alzheimer", &["alzheimer disease", "dementia"]),
    ("flu", &["influenza"]),
    ("covid", &["covid-19", "sars-cov-2"]),
    ("obesity", &["overweight", "adiposity"]),
    ("asthma", &["bronchial asthma", "reactive airway disease"]),
    ("migraine", &["migraine headache", "migraine disorders"]),
    ("statin", &["hmg-coa reductase inhibitor"]),
    ("ssri", &["selective serotonin reuptake inhibitor"]),
    ("sglt2 inhibitor", &["sodium-glucose cotransporter-2 inhibitor", "gliflozin"]),
    ("glp-1", &["glucagon-like peptide-1", "glp-1 receptor agonist"]),
    ("ace inhibitor", &["angiotensin-converting enzyme inhibitor"]),
    ("beta blocker", &["beta-adrenergic blocker", "beta-adrenergic antagonist"]),
];

pub const MAX_ALTERNATES_PER_CONCEPT: usize = 3;

/// Intent categories a query can express, with the candidate-side
/// vocabulary that earns the intent bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Treatment,
    Prevention,
    Diagnosis,
    Prognosis,
}

/// Query-side trigger terms per intent.
pub const INTENT_TRIGGERS: &[(QueryIntent, &[&str])] = &[
    (
        QueryIntent::Treatment,
        &[
            "treatment", "therapy", "treat", "cure", "management", "drug",
            "medication", "dose", "efficacy", "intervention",
        ],
    ),
    (
        QueryIntent::Prevention,
        &[
            "prevention", "prevent", "prophylaxis", "vaccine", "vaccination",
            "screening", "risk reduction",
        ],
    ),
    (
        QueryIntent::Diagnosis,
        &[
            "diagnosis", "diagnose", "diagnostic", "test", "testing",
            "biomarker", "imaging", "detection",
        ],
    ),
    (
        QueryIntent::Prognosis,
        &["prognosis", "survival", "mortality", "outcome", "life expectancy"],
    ),
];

/// Candidate-side vocabulary that matches an interventional intent.
pub const INTENT_MATCH_TERMS: &[(QueryIntent, &[&str])] = &[
    (
        QueryIntent::Treatment,
        &[
            "trial", "therapy", "treatment", "intervention", "efficacy",
            "randomized", "randomised", "placebo", "dose",
        ],
    ),
    (
        QueryIntent::Prevention,
        &[
            "prevention", "prophylaxis", "vaccine", "screening", "risk",
            "incidence reduction",
        ],
    ),
    (
        QueryIntent::Diagnosis,
        &[
            "diagnostic", "sensitivity", "specificity", "accuracy",
            "biomarker", "imaging", "detection",
        ],
    ),
    (
        QueryIntent::Prognosis,
        &["survival", "mortality", "prognostic", "follow-up", "hazard ratio"],
    ),
];

/// Terms marking a purely descriptive/epidemiological paper; penalized
/// when the query intent is interventional and none of the intent match
/// terms appear.
pub const DESCRIPTIVE_TERMS: &[&str] = &[
    "prevalence", "cross-sectional", "survey", "descriptive", "awareness",
    "attitudes", "knowledge", "perceptions", "trends",
];

/// Stop words removed before term matching. Includes the query filler
/// common in natural-language medical questions.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "best", "but", "by", "can",
    "do", "does", "for", "from", "how", "in", "is", "it", "its", "of", "on",
    "or", "should", "than", "that", "the", "their", "there", "these",
    "this", "to", "was", "were", "what", "when", "which", "who", "why",
    "will", "with", "you",
];
