pub const USER_SCHEMA: &str = r#"
    DEFINE TABLE user SCHEMAFULL;

    DEFINE FIELD username ON TABLE user TYPE string;
    DEFINE FIELD email ON TABLE user TYPE string ASSERT string::is::email($value);
    DEFINE FIELD password_hash ON TABLE user TYPE option<string>;
    DEFINE FIELD role ON TABLE user TYPE string ASSERT $value IN ["student", "teacher"];
    DEFINE FIELD class_subject ON TABLE user TYPE option<string>;
    DEFINE FIELD google_id ON TABLE user TYPE option<string>;
    DEFINE FIELD profile_picture ON TABLE user TYPE option<string>;
    DEFINE FIELD auth_provider ON TABLE user TYPE string;
    DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
    DEFINE FIELD profile_complete ON TABLE user TYPE bool DEFAULT false;
    DEFINE FIELD created_at ON TABLE user TYPE datetime;
    DEFINE FIELD updated_at ON TABLE user TYPE datetime;

    DEFINE INDEX user_email ON TABLE user FIELDS email UNIQUE;
    DEFINE INDEX user_role ON TABLE user FIELDS role;
    DEFINE INDEX user_google_id ON TABLE user FIELDS google_id;
"#;

// Session and reset-token records are keyed by the token digest, so the record id
// itself is the uniqueness constraint.
pub const SESSION_SCHEMA: &str = r#"
    DEFINE TABLE session SCHEMAFULL;

    DEFINE FIELD user_id ON TABLE session TYPE string;
    DEFINE FIELD created_at ON TABLE session TYPE datetime;
    DEFINE FIELD expires_at ON TABLE session TYPE datetime;

    DEFINE INDEX session_user ON TABLE session FIELDS user_id;
    DEFINE INDEX session_expiry ON TABLE session FIELDS expires_at;
"#;

pub const RESET_TOKEN_SCHEMA: &str = r#"
    DEFINE TABLE reset_token SCHEMAFULL;

    DEFINE FIELD email ON TABLE reset_token TYPE string;
    DEFINE FIELD created_at ON TABLE reset_token TYPE datetime;
    DEFINE FIELD expires_at ON TABLE reset_token TYPE datetime;
    DEFINE FIELD used ON TABLE reset_token TYPE bool DEFAULT false;

    DEFINE INDEX reset_token_email ON TABLE reset_token FIELDS email;
"#;

pub const COURSE_SCHEMA: &str = r#"
    DEFINE TABLE course SCHEMAFULL;

    DEFINE FIELD owner_id ON TABLE course TYPE string;
    DEFINE FIELD name ON TABLE course TYPE string;
    DEFINE FIELD teacher_name ON TABLE course TYPE option<string>;
    DEFINE FIELD subject ON TABLE course TYPE option<string>;
    DEFINE FIELD schedule ON TABLE course TYPE option<string>;
    DEFINE FIELD location ON TABLE course TYPE option<string>;
    DEFINE FIELD contact_info ON TABLE course TYPE option<string>;
    DEFINE FIELD fees ON TABLE course TYPE option<string>;
    DEFINE FIELD description ON TABLE course TYPE option<string>;
    DEFINE FIELD created_at ON TABLE course TYPE datetime;
    DEFINE FIELD updated_at ON TABLE course TYPE datetime;

    DEFINE INDEX course_owner ON TABLE course FIELDS owner_id;
"#;

pub const ENROLLMENT_SCHEMA: &str = r#"
    DEFINE TABLE enrollment SCHEMAFULL;

    DEFINE FIELD course_id ON TABLE enrollment TYPE string;
    DEFINE FIELD student_id ON TABLE enrollment TYPE string;
    DEFINE FIELD teacher_id ON TABLE enrollment TYPE string;
    DEFINE FIELD enrolled_at ON TABLE enrollment TYPE datetime;

    DEFINE INDEX enrollment_pair ON TABLE enrollment FIELDS course_id, student_id UNIQUE;
    DEFINE INDEX enrollment_student ON TABLE enrollment FIELDS student_id;
"#;

// Exams and submissions carry opaque JSON (questions, answers), so these tables stay
// schemaless and only pin down their indexes.
pub const EXAM_SCHEMA: &str = r#"
    DEFINE TABLE exams SCHEMALESS;
    DEFINE INDEX exams_course ON TABLE exams FIELDS course_id;
    DEFINE INDEX exams_owner ON TABLE exams FIELDS owner_id;

    DEFINE TABLE public_exams SCHEMALESS;
    DEFINE INDEX public_exams_owner ON TABLE public_exams FIELDS owner_id;
"#;

pub const SUBMISSION_SCHEMA: &str = r#"
    DEFINE TABLE exam_results SCHEMALESS;
    DEFINE INDEX exam_results_identity ON TABLE exam_results FIELDS exam_id, identity_key UNIQUE;
    DEFINE INDEX exam_results_student ON TABLE exam_results FIELDS course_id, student_id;

    DEFINE TABLE guest_submissions SCHEMALESS;
    DEFINE INDEX guest_submissions_identity ON TABLE guest_submissions FIELDS exam_id, identity_key UNIQUE;
"#;

pub const ALL_SCHEMAS: [&str; 7] = [
    USER_SCHEMA,
    SESSION_SCHEMA,
    RESET_TOKEN_SCHEMA,
    COURSE_SCHEMA,
    ENROLLMENT_SCHEMA,
    EXAM_SCHEMA,
    SUBMISSION_SCHEMA,
];
