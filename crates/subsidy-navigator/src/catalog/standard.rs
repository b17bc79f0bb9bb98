//! Built-in catalog covering IT導入補助金, ものづくり補助金 and 小規模事業者持続化補助金.

use super::{
    AnswerOption, ConditionKey, ConditionQuestion, DocumentCatalog, DocumentId,
    DocumentRequirement, Frame, FrameRule, MatchThresholds, ProgramId, ProgramProfile, Question,
    QuestionSet, SubsidyCatalog, TemplateQuestion, TokenWeights, WeightTable,
};

enum Activation {
    All,
    Frames(&'static [&'static str]),
    When(&'static str),
}

impl SubsidyCatalog {
    pub fn standard() -> Self {
        Self {
            question_set: QuestionSet {
                questions: standard_questions(),
                scoring_weights: standard_weights(),
                threshold_scores: MatchThresholds {
                    high_match: 70,
                    medium_match: 40,
                },
            },
            programs: standard_programs(),
            catalogs: vec![it_donyu_catalog(), monozukuri_catalog(), jizokuka_catalog()],
        }
    }
}

fn option(value: &str, label: &str, icon: &str, description: &str) -> AnswerOption {
    AnswerOption {
        value: value.to_string(),
        label: label.to_string(),
        icon: icon.to_string(),
        description: description.to_string(),
    }
}

fn standard_questions() -> Vec<Question> {
    vec![
        Question {
            id: "business_type".to_string(),
            question: "あなたの事業の業種を教えてください".to_string(),
            options: vec![
                option("manufacturing", "製造業", "🏭", "部品加工・食品製造などのものづくり"),
                option("retail", "小売・卸売業", "🛒", "店舗販売・ネット通販・卸売"),
                option("service", "サービス業", "🤝", "美容・介護・士業などの対人サービス"),
                option("it", "情報通信業", "💻", "ソフトウェア開発・Web制作"),
                option("food", "飲食業", "🍜", "飲食店・テイクアウト・ケータリング"),
            ],
        },
        Question {
            id: "employee_count".to_string(),
            question: "常時使用する従業員数は何人ですか".to_string(),
            options: vec![
                option("micro", "5人以下", "👤", "小規模事業者に該当する可能性が高い規模"),
                option("small", "6〜20人", "👥", "製造業等では小規模事業者の範囲"),
                option("medium", "21〜300人", "🏢", "中小企業者の範囲"),
            ],
        },
        Question {
            id: "investment_purpose".to_string(),
            question: "補助金で実現したいことは何ですか".to_string(),
            options: vec![
                option("it_tools", "ITツールで業務を効率化したい", "⚙️", "会計・受発注・顧客管理などのソフト導入"),
                option("equipment", "設備投資・新製品を開発したい", "🔧", "機械装置やシステム構築による革新"),
                option("sales_channel", "販路を開拓したい", "📣", "チラシ・Webサイト・展示会出展など"),
                option("security", "セキュリティを強化したい", "🔒", "サイバー攻撃への備え"),
            ],
        },
        Question {
            id: "budget".to_string(),
            question: "予定している投資額はどのくらいですか".to_string(),
            options: vec![
                option("under_500k", "50万円未満", "💴", ""),
                option("under_3m", "50万〜300万円", "💴", ""),
                option("under_10m", "300万〜1,000万円", "💰", ""),
                option("over_10m", "1,000万円以上", "💰", ""),
            ],
        },
        Question {
            id: "digital_maturity".to_string(),
            question: "現在のIT活用状況に近いものはどれですか".to_string(),
            options: vec![
                option("paper_based", "紙・手作業が中心", "📄", ""),
                option("partial", "一部の業務でITを活用", "🖥️", ""),
                option("advanced", "主要業務はシステム化済み", "☁️", ""),
            ],
        },
    ]
}

fn weights(pairs: &[(&str, i32)]) -> TokenWeights {
    pairs
        .iter()
        .map(|(token, weight)| (token.to_string(), *weight))
        .collect()
}

fn standard_weights() -> WeightTable {
    WeightTable::new(vec![
        (
            ProgramId::new("it_donyu"),
            weights(&[
                ("manufacturing", 5),
                ("retail", 15),
                ("service", 15),
                ("it", 10),
                ("food", 15),
                ("micro", 10),
                ("small", 15),
                ("medium", 10),
                ("it_tools", 40),
                ("security", 35),
                ("sales_channel", 5),
                ("under_500k", 15),
                ("under_3m", 20),
                ("under_10m", 5),
                ("paper_based", 15),
                ("partial", 10),
            ]),
        ),
        (
            ProgramId::new("monozukuri"),
            weights(&[
                ("manufacturing", 30),
                ("service", 5),
                ("it", 10),
                ("micro", 5),
                ("small", 10),
                ("medium", 20),
                ("equipment", 40),
                ("it_tools", 5),
                ("under_3m", 5),
                ("under_10m", 15),
                ("over_10m", 20),
                ("partial", 5),
                ("advanced", 10),
            ]),
        ),
        (
            ProgramId::new("jizokuka"),
            weights(&[
                ("manufacturing", 5),
                ("retail", 20),
                ("service", 15),
                ("it", 5),
                ("food", 20),
                ("micro", 30),
                ("small", 15),
                ("sales_channel", 40),
                ("it_tools", 5),
                ("under_500k", 20),
                ("under_3m", 15),
                ("paper_based", 5),
                ("partial", 5),
            ]),
        ),
    ])
}

fn standard_programs() -> Vec<ProgramProfile> {
    vec![
        ProgramProfile {
            id: ProgramId::new("it_donyu"),
            name: "IT導入補助金".to_string(),
            description: "中小企業・小規模事業者のITツール（ソフトウェア・クラウドサービス等）導入費用を支援します。".to_string(),
            icon: "💻".to_string(),
        },
        ProgramProfile {
            id: ProgramId::new("monozukuri"),
            name: "ものづくり補助金".to_string(),
            description: "革新的な製品・サービスの開発や生産プロセス改善に必要な設備投資を支援します。".to_string(),
            icon: "🏭".to_string(),
        },
        ProgramProfile {
            id: ProgramId::new("jizokuka"),
            name: "小規模事業者持続化補助金".to_string(),
            description: "小規模事業者が経営計画に基づいて行う販路開拓や業務効率化の取組を支援します。".to_string(),
            icon: "🏪".to_string(),
        },
    ]
}

fn document(
    id: &str,
    name: &str,
    category: &str,
    description: &str,
    activation: Activation,
    questions: &[&str],
) -> DocumentRequirement {
    let (required_for_all, required_for_frames, required_when) = match activation {
        Activation::All => (true, Vec::new(), None),
        Activation::Frames(frames) => (false, frames.iter().map(|f| Frame::new(*f)).collect(), None),
        Activation::When(key) => (false, Vec::new(), Some(ConditionKey::new(key))),
    };

    DocumentRequirement {
        id: DocumentId::new(id),
        name: name.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        required_for_all,
        required_for_frames,
        required_when,
        template_questions: questions
            .iter()
            .enumerate()
            .map(|(index, prompt)| TemplateQuestion::new(format!("q{}", index + 1), *prompt))
            .collect(),
    }
}

fn condition(key: &str, question: &str, description: &str) -> ConditionQuestion {
    ConditionQuestion {
        key: ConditionKey::new(key),
        question: question.to_string(),
        description: description.to_string(),
    }
}

fn frame_rule(frame: &str, description: &str) -> FrameRule {
    FrameRule {
        frame: Frame::new(frame),
        description: description.to_string(),
    }
}

fn it_donyu_catalog() -> DocumentCatalog {
    DocumentCatalog {
        program: ProgramId::new("it_donyu"),
        documents: vec![
            document(
                "business_plan",
                "事業計画（申請内容）",
                "事業計画",
                "IT導入支援事業者と共同で作成する申請内容です。",
                Activation::All,
                &[
                    "現在の業務上の課題を教えてください",
                    "導入するITツールと選定理由を教えてください",
                    "導入による労働生産性の向上見込みを教えてください",
                    "賃上げの計画を教えてください",
                ],
            ),
            document(
                "gbiz_id",
                "gBizIDプライム",
                "アカウント",
                "電子申請に必要な共通認証アカウントです。",
                Activation::All,
                &["gBizIDプライムの取得状況", "取得日または申請日"],
            ),
            document(
                "security_action",
                "SECURITY ACTION宣言",
                "宣誓",
                "IPAが実施する情報セキュリティ対策の自己宣言です。",
                Activation::All,
                &["宣言の段階（一つ星／二つ星）", "宣言済アカウントID"],
            ),
            document(
                "tax_certificate",
                "納税証明書",
                "証明書類",
                "直近分の納税証明書（その1またはその2）です。",
                Activation::All,
                &["税目（法人税／所得税）", "証明対象の年度"],
            ),
            document(
                "corporate_registry",
                "履歴事項全部証明書",
                "証明書類",
                "発行から3ヶ月以内のものが必要です。",
                Activation::When("is_corporation"),
                &["法人名", "法人番号", "発行日"],
            ),
            document(
                "tax_return",
                "確定申告書の控え",
                "証明書類",
                "直近分の所得税確定申告書（第一表）の控えです。",
                Activation::When("is_sole_proprietor"),
                &["申告年度", "事業所得の金額"],
            ),
            document(
                "invoice_plan",
                "インボイス対応計画",
                "枠別書類",
                "インボイス制度に対応した会計・受発注・決済ソフトの導入計画です。",
                Activation::Frames(&["digital"]),
                &[
                    "現在の請求書の発行方法",
                    "インボイス制度への対応方針",
                    "導入する会計・受発注・決済ソフト",
                ],
            ),
            document(
                "hardware_list",
                "ハードウェア購入計画",
                "枠別書類",
                "ソフトウェアと一体で導入するPC・タブレット・レジ等の一覧です。",
                Activation::Frames(&["digital"]),
                &["購入予定のハードウェア", "導入するソフトウェアとの関連"],
            ),
            document(
                "security_service_plan",
                "サイバーセキュリティお助け隊サービス導入計画",
                "枠別書類",
                "セキュリティ対策推進枠で導入するサービスの計画です。",
                Activation::Frames(&["security"]),
                &["想定しているセキュリティリスク", "導入予定のサービス名"],
            ),
        ],
        conditions: vec![
            condition("is_corporation", "法人として申請しますか？", "株式会社・合同会社などの法人"),
            condition("is_sole_proprietor", "個人事業主として申請しますか？", ""),
        ],
        frames: vec![
            frame_rule("normal", "通常枠：業務効率化・売上向上に資するソフトウェアの導入"),
            frame_rule("digital", "インボイス枠：会計・受発注・決済ソフトとハードウェアの導入"),
            frame_rule("security", "セキュリティ対策推進枠：お助け隊サービスの利用"),
        ],
    }
}

fn monozukuri_catalog() -> DocumentCatalog {
    DocumentCatalog {
        program: ProgramId::new("monozukuri"),
        documents: vec![
            document(
                "business_plan",
                "事業計画書",
                "事業計画",
                "革新性・実現可能性・政策面を審査される中心的な書類です。",
                Activation::All,
                &[
                    "事業の現状と課題",
                    "開発する製品・サービスの革新性",
                    "実施体制とスケジュール",
                    "市場性と収益性の見込み",
                ],
            ),
            document(
                "wage_plan",
                "賃金引上げ計画の表明書",
                "宣誓",
                "従業員に表明した賃上げ計画の写しです。",
                Activation::All,
                &["給与支給総額の年率増加目標", "事業場内最低賃金の引上げ計画"],
            ),
            document(
                "financial_statements",
                "決算書（直近2期分）",
                "財務書類",
                "貸借対照表・損益計算書・製造原価報告書などです。",
                Activation::All,
                &["直近期の売上高", "直近期の営業利益", "前期の売上高"],
            ),
            document(
                "green_plan",
                "温室効果ガス排出削減計画",
                "枠別書類",
                "グリーン枠で求められる排出削減の取組計画です。",
                Activation::Frames(&["green"]),
                &["現在のCO2排出量の把握方法", "削減目標と具体的な取組"],
            ),
            document(
                "overseas_plan",
                "海外事業計画",
                "枠別書類",
                "グローバル枠で求められる海外展開の計画です。",
                Activation::Frames(&["global"]),
                &["対象国・地域", "海外事業の実施体制"],
            ),
            document(
                "loan_confirmation",
                "金融機関による確認書",
                "証明書類",
                "金融機関から借入を行う場合に必要です。",
                Activation::When("uses_bank_loan"),
                &["金融機関名", "借入予定額"],
            ),
        ],
        conditions: vec![condition(
            "uses_bank_loan",
            "補助事業の実施に金融機関からの借入を予定していますか？",
            "",
        )],
        frames: vec![
            frame_rule("normal", "製品・サービス高付加価値化枠：革新的な新製品・新サービスの開発"),
            frame_rule("green", "グリーン枠：温室効果ガス排出削減に資する取組"),
            frame_rule("global", "グローバル枠：海外事業の拡大・強化"),
        ],
    }
}

fn jizokuka_catalog() -> DocumentCatalog {
    DocumentCatalog {
        program: ProgramId::new("jizokuka"),
        documents: vec![
            document(
                "application_form",
                "小規模事業者持続化補助金事業に係る申請書（様式1）",
                "申請書",
                "",
                Activation::All,
                &["申請者名", "補助事業の名称"],
            ),
            document(
                "management_plan",
                "経営計画書（様式2）",
                "事業計画",
                "自社の現状分析と今後の方針を記載します。",
                Activation::All,
                &[
                    "企業概要",
                    "顧客ニーズと市場の動向",
                    "自社や自社の提供する商品・サービスの強み",
                    "経営方針・目標と今後のプラン",
                ],
            ),
            document(
                "subsidy_plan",
                "補助事業計画書（様式3）",
                "事業計画",
                "補助金で実施する取組の内容と効果を記載します。",
                Activation::All,
                &[
                    "補助事業で行う事業名",
                    "販路開拓等の取組内容",
                    "業務効率化の取組内容",
                    "補助事業の効果",
                ],
            ),
            document(
                "support_plan",
                "事業支援計画書（様式4）",
                "確認書類",
                "地域の商工会・商工会議所が発行します。",
                Activation::All,
                &["商工会・商工会議所名", "相談日"],
            ),
            document(
                "wage_ledger",
                "賃金台帳",
                "枠別書類",
                "賃金引上げ特例を申請する場合に必要です。",
                Activation::Frames(&["wage_increase"]),
                &["現在の事業場内最低賃金", "引上げ後の事業場内最低賃金"],
            ),
            document(
                "founding_certificate",
                "特定創業支援等事業の証明書",
                "枠別書類",
                "市区町村が発行する証明書です。",
                Activation::Frames(&["founding"]),
                &["証明書の発行自治体", "証明書の発行日"],
            ),
            document(
                "successor_documents",
                "後継者候補の確認書類",
                "枠別書類",
                "後継者支援枠を申請する場合に必要です。",
                Activation::Frames(&["succession"]),
                &["後継者候補の氏名", "代表者との関係"],
            ),
            document(
                "succession_diagnosis",
                "事業承継診断票（様式6）",
                "確認書類",
                "代表者が満60歳以上の場合に提出します。",
                Activation::When("ceo_over_60"),
                &["代表者の年齢", "後継者候補の有無", "事業承継に向けた取組状況"],
            ),
        ],
        conditions: vec![condition(
            "ceo_over_60",
            "代表者は満60歳以上ですか？",
            "申請時点の年齢で判断します",
        )],
        frames: vec![
            frame_rule("normal", "通常枠：販路開拓等の取組"),
            frame_rule("wage_increase", "賃金引上げ特例：事業場内最低賃金を引き上げる事業者"),
            frame_rule("succession", "後継者支援枠：アトツギ甲子園のファイナリスト等"),
            frame_rule("founding", "創業枠：特定創業支援等事業の支援を受けた創業者"),
        ],
    }
}
