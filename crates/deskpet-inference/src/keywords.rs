//! Keyword tables for rule inference (C6, §4.6).
//!
//! Ported verbatim from the original `UserInferenceService`'s keyword
//! dictionaries so scoring behaviour matches exactly — these are domain
//! vocabulary, not prose, so they stay in their original language.

/// Occupation -> keyword list. Order is insertion order and does not affect
/// scoring (every category is scored independently).
pub const OCCUPATION_KEYWORDS: &[(&str, &[&str])] = &[
    ("程序员", &["编程", "代码", "bug", "调试", "开发", "算法", "github", "python", "java"]),
    ("学生", &["作业", "考试", "老师", "同学", "课程", "学校", "论文", "考研"]),
    ("设计师", &["设计", "UI", "UX", "配色", "排版", "ps", "ai", "figma"]),
    ("产品经理", &["需求", "产品", "用户体验", "功能", "迭代", "PRD"]),
    ("教师", &["学生", "教学", "课堂", "备课", "教案", "家长"]),
    ("医生", &["患者", "病历", "诊断", "治疗", "医院", "科室"]),
    ("销售", &["客户", "业绩", "销售", "订单", "市场", "推广"]),
    ("自媒体", &["粉丝", "流量", "视频", "文章", "up主", "博主"]),
    ("运营", &["用户运营", "活动", "增长", "拉新", "留存", "转化"]),
];

pub const INTEREST_KEYWORDS: &[(&str, &[&str])] = &[
    ("科技", &["科技", "AI", "人工智能", "机器学习", "编程", "数码", "电子产品"]),
    ("游戏", &["游戏", "打游戏", "王者", "吃鸡", "英雄联盟", "原神", "steam"]),
    ("动漫", &["动漫", "番剧", "二次元", "B站", "追番", "漫画", "cos"]),
    ("音乐", &["音乐", "歌曲", "听歌", "音乐会", "演唱会", "乐队"]),
    ("阅读", &["读书", "小说", "书籍", "阅读", "看书", "文学"]),
    ("运动", &["运动", "健身", "跑步", "篮球", "足球", "游泳", "瑜伽"]),
    ("旅游", &["旅游", "旅行", "景点", "度假", "出国", "打卡"]),
    ("美食", &["美食", "吃货", "火锅", "烧烤", "餐厅", "做饭", "烹饪"]),
    ("电影", &["电影", "影院", "看电影", "影视", "导演", "演员"]),
    ("摄影", &["摄影", "拍照", "相机", "镜头", "照片", "后期"]),
];

pub const AGE_KEYWORDS: &[(&str, &[&str])] = &[
    ("18-24", &["大学", "考研", "毕业", "校园", "室友", "宿舍", "社团"]),
    ("25-30", &["工作", "加班", "同事", "跳槽", "职场", "升职"]),
    ("31-40", &["结婚", "孩子", "房贷", "车贷", "家庭", "父母"]),
    ("40+", &["养生", "健康", "退休", "保健", "儿女"]),
];

pub const MALE_KEYWORDS: &[&str] = &["哥们", "兄弟", "老铁", "篮球", "足球", "游戏", "码农"];
pub const FEMALE_KEYWORDS: &[&str] = &["姐妹", "小姐姐", "护肤", "化妆", "逛街", "包包", "美甲"];

pub const EDUCATION_KEYWORDS: &[(&str, &[&str])] = &[
    ("博士", &["博士", "PhD", "读博", "博导"]),
    ("硕士", &["硕士", "研究生", "考研", "导师"]),
    ("本科", &["本科", "大学", "学士", "大学生"]),
    ("专科", &["专科", "大专"]),
];

pub const FORMAL_INDICATORS: &[&str] = &["请问", "您好", "谢谢", "麻烦", "不好意思"];
pub const CASUAL_INDICATORS: &[&str] = &["哈哈", "嘿嘿", "啊", "呀", "哦", "嗯"];

pub const POSITIVE_WORDS: &[&str] = &["开心", "高兴", "快乐", "哈哈", "喜欢", "爱", "棒", "好", "赞", "不错", "太好了"];
pub const NEGATIVE_WORDS: &[&str] = &["难过", "伤心", "生气", "烦", "累", "讨厌", "糟糕", "不好", "失望"];
pub const ANXIOUS_WORDS: &[&str] = &["焦虑", "紧张", "担心", "害怕", "不安", "压力"];

/// Markers that indicate forward relationship movement in an LLM session
/// summary's `relationship_progress` field (§9 open question, resolved).
pub const PROGRESS_MARKERS: &[&str] = &["进展", "信任", "progress", "trust"];

/// Count non-overlapping occurrences of `needle` in `haystack`. Mirrors
/// Python's `str.count`, which the original keyword scoring relies on.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}
