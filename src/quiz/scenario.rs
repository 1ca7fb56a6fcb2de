use crate::quiz::error::QuizResult;
use crate::quiz::node::Node;
use crate::quiz::tree::{QuizTree, DEFAULT_START};

// ---------------------------------------------------------------------------
// Personality quiz scenario
// ---------------------------------------------------------------------------

/// The built-in personality quiz: ten questions, ten personality types.
pub fn personality_scenario() -> QuizResult<QuizTree> {
    let nodes = vec![
        Node::question(DEFAULT_START, "あなたはよく外出をするほうですか？", "q1", "q2"),
        Node::question("q1", "コミュ力があると思う？", "q3", "q4"),
        Node::question("q2", "思考力があるほうだと思う？", "q4", "q5"),
        Node::question("q3", "仲間が失敗しても許してあげる？", "q6", "q7"),
        Node::question("q4", "自分は聞き上手だと思う？", "q8", "q9"),
        Node::question("q5", "自分には特別な力があると思う？", "j", "i"),
        Node::question("q6", "自分より他人のことを優先する？", "a", "b"),
        Node::question("q7", "失敗してしまったら落ち込むよりもイライラする？", "c", "d"),
        Node::question("q8", "一人よりも大人数のほうがいい？", "e", "f"),
        Node::question("q9", "感情的になりやすいと思う？", "g", "h"),
        // --- Results ---
        Node::result_with(
            "a",
            "🌟 ポジティブタイプ",
            "前向きでエネルギッシュ。仲間を元気づけ、いつも明るい雰囲気を作るムードメーカー！",
        ),
        Node::result_with(
            "b",
            "🌸 優しいタイプ",
            "優しくて思いやりがあり、周囲から信頼されるタイプ。誰かが困っているとすぐに助けたくなる。",
        ),
        Node::result_with(
            "c",
            "🌧 ネガティブタイプ",
            "慎重で物事を深く考えるタイプ。少しネガティブに見えるけど、実はとても繊細で真面目！",
        ),
        Node::result_with(
            "d",
            "🔥 怒りっぽいタイプ",
            "情熱的で負けず嫌い。怒ることもあるけれど、それは本気で向き合っている証拠！",
        ),
        Node::result_with(
            "e",
            "❄️ クールタイプ",
            "冷静沈着で頭の回転が速い。どんなときも落ち着いていて、周りから頼られるタイプ。",
        ),
        Node::result_with(
            "f",
            "🌙 おとなしいタイプ",
            "おとなしくてマイペース。自分の世界を大切にしていて、無理に合わせない芯の強さがある。",
        ),
        Node::result_with(
            "g",
            "🎭 感情豊かなタイプ",
            "感情豊かで表現力が高い。人の気持ちを察するのが得意で、周りを和ませる存在。",
        ),
        Node::result_with(
            "h",
            "💪 熱血タイプ",
            "熱血で努力家！どんなことにも一生懸命取り組み、仲間を引っ張っていくリーダー気質。",
        ),
        Node::result_with(
            "i",
            "🌼 天然タイプ",
            "マイペースで天真爛漫。周囲を癒す不思議な魅力があり、みんなを笑顔にする。",
        ),
        Node::result_with(
            "j",
            "🌀 変人タイプ",
            "独創的で発想力抜群！少し変わってるけど、そのユニークさがあなたの最大の武器！",
        ),
    ];

    QuizTree::new(nodes, DEFAULT_START)
}
