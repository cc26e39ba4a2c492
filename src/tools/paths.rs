//! Platform endpoint paths, relative to the API or download base

pub const TEACHER_GROUPS: &str = "group/teacher/groups";
pub const GROUP_CLASSES: &str = "group/classes";
pub const CLASS_STUDENTS: &str = "group/class/members";

pub const GROUP_TASKS: &str = "group/tasks";
pub const TEST_RESULT: &str = "survey/course/queryStuPaperResult";
pub const PREVIEW_STUDENT_PAPER: &str = "survey/course/previewStuPaper";
pub const MARK_ANSWER: &str = "survey/course/markAnswer";

pub const PAPER_QUESTIONS: &str = "survey/paper/questions";
pub const ADD_QUESTION: &str = "survey/addQuestion";
pub const IMPORT_QUESTIONS: &str = "survey/question/import";
pub const UPDATE_QUESTION: &str = "survey/updateQuestion";
pub const UPDATE_PROGRAM_SETTING: &str = "survey/question/updateProgramSetting";
pub const DELETE_QUESTION: &str = "survey/delQuestion";

pub const ATTENDANCE_SESSIONS: &str = "register/group/list";
pub const ATTENDANCE_RECORDS: &str = "register/user/list";
pub const UPDATE_ATTENDANCE: &str = "register/user/updateStatus";

pub const COURSE_RESOURCES: &str = "resource/queryCourseResources";
pub const UPDATE_RESOURCE: &str = "resource/updateSetting";
/// Under the download base
pub const DOWNLOAD_URL: &str = "resource/getDownloadUrl";
