use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::text::fold;

/// Label assigned when no keyword matches.
pub const OTHER_CATEGORY: &str = "Outros";

const OTHER_CATEGORY_ID: &str = "outros";
const DEFAULT_COLOR: &str = "#757575";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub id: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl CategoryDefinition {
    /// Builds a user category, deriving the id from the name.
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        CategoryDefinition {
            id: category_id(name),
            name: name.trim().to_string(),
            color: default_color(),
            description: String::new(),
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("Failed to parse categories: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Category '{0}' has an empty name")]
    EmptyName(String),
}

/// Slug id for a category name: accents folded, lowercase, anything that is
/// not `[a-z0-9]` replaced by `_`.
pub fn category_id(name: &str) -> String {
    fold(name.trim())
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Ordered keyword dictionary. Iteration order is the matching precedence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryDictionary {
    categories: Vec<CategoryDefinition>,
}

#[derive(Deserialize)]
struct CategoriesFile {
    #[serde(default)]
    categories: Vec<CategoryDefinition>,
}

impl CategoryDictionary {
    pub fn builtin() -> Self {
        CategoryDictionary {
            categories: default_categories(),
        }
    }

    pub fn empty() -> Self {
        CategoryDictionary::default()
    }

    pub fn from_definitions(categories: Vec<CategoryDefinition>) -> Self {
        CategoryDictionary { categories }
    }

    /// Parses `[[categories]]` tables. A missing `id` is not allowed by the
    /// format; use [`category_id`] when building entries by hand.
    pub fn from_toml(content: &str) -> Result<Self, CategoryError> {
        let file: CategoriesFile = toml::from_str(content)?;
        if let Some(bad) = file.categories.iter().find(|c| c.name.trim().is_empty()) {
            return Err(CategoryError::EmptyName(bad.id.clone()));
        }
        Ok(CategoryDictionary::from_definitions(file.categories))
    }

    /// Merges user entries into this dictionary. An entry whose id already
    /// exists extends that entry's keywords in place (duplicates dropped);
    /// unknown ids are appended after the existing entries.
    pub fn merge(mut self, user: impl IntoIterator<Item = CategoryDefinition>) -> Self {
        for entry in user {
            match self.categories.iter_mut().find(|c| c.id == entry.id) {
                Some(existing) => {
                    for keyword in entry.keywords {
                        if !existing.keywords.contains(&keyword) {
                            existing.keywords.push(keyword);
                        }
                    }
                }
                None => self.categories.push(entry),
            }
        }
        self
    }

    pub fn categories(&self) -> &[CategoryDefinition] {
        &self.categories
    }

    pub fn get(&self, id: &str) -> Option<&CategoryDefinition> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&CategoryDefinition> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Color for a category label, falling back to the "other" gray.
    pub fn color_of(&self, name: &str) -> &str {
        self.find_by_name(name)
            .map(|c| c.color.as_str())
            .unwrap_or(DEFAULT_COLOR)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

fn def(id: &str, name: &str, color: &str, description: &str, keywords: &[&str]) -> CategoryDefinition {
    CategoryDefinition {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
        description: description.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

/// Built-in dictionary. Keywords are matched after accent folding, so only
/// one spelling of each is needed.
pub fn default_categories() -> Vec<CategoryDefinition> {
    vec![
        def(
            "moradia",
            "Moradia",
            "#8E24AA",
            "Aluguel, condomínio, IPTU, reformas, etc.",
            &[
                "aluguel", "condomínio", "iptu", "reforma", "apartamento", "imóvel",
                "imobiliária", "prestação", "seguro residencial", "construção",
            ],
        ),
        def(
            "alimentacao",
            "Alimentação",
            "#43A047",
            "Supermercado, restaurantes, delivery, etc.",
            &[
                "restaurante", "ifood", "rappi", "uber eats", "supermercado", "mercado",
                "lanchonete", "lanches", "pizzaria", "pizza", "delivery", "padaria", "açougue",
                "hortifruti", "confeitaria", "sorveteria", "café", "burger", "grill", "feira",
                "comida", "food",
            ],
        ),
        def(
            "transporte",
            "Transporte",
            "#1E88E5",
            "Combustível, transporte público, aplicativos, manutenção, etc.",
            &[
                "uber", "99app", "99 pop", "cabify", "táxi", "taxi", "gasolina", "combustível",
                "etanol", "diesel", "posto", "estacionamento", "metrô", "ônibus", "pedágio",
                "sem parar", "oficina", "mecânico", "brt",
            ],
        ),
        def(
            "lazer",
            "Lazer",
            "#FFB300",
            "Cinema, shows, streaming, jogos, etc.",
            &[
                "cinema", "teatro", "show", "ingresso", "netflix", "spotify", "deezer",
                "disney", "prime video", "amazon prime", "hbo", "jogos", "games", "playstation",
                "xbox", "nintendo", "steam", "museu", "parque", "balada",
            ],
        ),
        def(
            "compras",
            "Compras",
            "#D81B60",
            "Roupas, calçados, eletrônicos, etc.",
            &[
                "lojas", "shopping", "vestuário", "roupa", "calçado", "sapato", "tênis",
                "eletrônico", "amazon", "mercadolivre", "magazine", "americanas", "shopee",
                "aliexpress", "zara", "renner", "riachuelo", "c&a",
            ],
        ),
        def(
            "saude",
            "Saúde",
            "#00897B",
            "Convênio, consultas, medicamentos, etc.",
            &[
                "hospital", "médico", "farmácia", "remédio", "medicamento", "drogaria",
                "drogasil", "droga raia", "consulta", "exame", "laboratório", "clínica", "dentista",
                "psicólogo", "terapia", "fisioterapia", "plano de saúde", "academia", "gym",
                "fitness",
            ],
        ),
        def(
            "educacao",
            "Educação",
            "#3949AB",
            "Mensalidade, cursos, livros, etc.",
            &[
                "faculdade", "escola", "colégio", "curso", "livraria", "livro", "universidade",
                "matrícula", "material escolar", "udemy", "alura", "coursera", "ensino",
            ],
        ),
        def(
            "financas",
            "Finanças",
            "#F4511E",
            "Juros, tarifas, investimentos, etc.",
            &[
                "tarifa", "juros", "empréstimo", "financiamento", "seguro", "iof", "anuidade",
                "imposto", "multa", "encargos",
            ],
        ),
        def(
            "pessoal",
            "Cuidados Pessoais",
            "#6D4C41",
            "Higiene, beleza, etc.",
            &[
                "salão", "cabelo", "barbearia", "barbeiro", "manicure", "perfumaria", "perfume",
                "maquiagem", "cosmético", "boticário", "natura", "estética",
            ],
        ),
        def(
            "utilidades",
            "Utilidades",
            "#5E35B1",
            "Água, luz, internet, telefone, etc.",
            &[
                "conta de luz", "conta de água", "energia", "enel", "sabesp", "internet",
                "telefone", "vivo", "claro", "tim celular", "tim s.a", "oi fibra", "gás", "tv a cabo",
            ],
        ),
        def(
            "viagem",
            "Viagem",
            "#039BE5",
            "Passagens, hospedagem, passeios, etc.",
            &[
                "passagem", "hotel", "hospedagem", "airbnb", "booking", "viagem", "resort",
                "excursão", "turismo", "pousada", "latam", "gol linhas", "azul linhas",
            ],
        ),
        def(
            "assinaturas",
            "Assinaturas e Serviços",
            "#7B1FA2",
            "Assinaturas de serviços recorrentes",
            &["assinatura", "mensalidade", "recorrente", "clube", "signature", "icloud", "google one"],
        ),
        def(
            "pets",
            "Pets",
            "#D32F2F",
            "Despesas com animais de estimação",
            &["petshop", "pet shop", "petz", "cobasi", "veterinário", "ração", "aquário"],
        ),
        def(
            OTHER_CATEGORY_ID,
            OTHER_CATEGORY,
            DEFAULT_COLOR,
            "Gastos que não se encaixam nas categorias anteriores",
            &[],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_unique_ids_and_ends_with_other() {
        let dict = CategoryDictionary::builtin();
        let mut ids: Vec<_> = dict.categories().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.last(), Some(&OTHER_CATEGORY_ID));
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), dict.len());
    }

    #[test]
    fn category_id_slugifies() {
        assert_eq!(category_id("Alimentação"), "alimentacao");
        assert_eq!(category_id("Cuidados Pessoais"), "cuidados_pessoais");
        assert_eq!(category_id("  Pets & Co "), "pets___co");
    }

    #[test]
    fn merge_extends_existing_entry_without_duplicates() {
        let user = CategoryDefinition {
            id: "alimentacao".into(),
            name: "Alimentação".into(),
            color: default_color(),
            description: String::new(),
            keywords: vec!["restaurante".into(), "empório".into()],
        };
        let dict = CategoryDictionary::builtin().merge(vec![user]);
        let food = dict.get("alimentacao").unwrap();
        assert_eq!(food.keywords.iter().filter(|k| *k == "restaurante").count(), 1);
        assert_eq!(food.keywords.last().map(String::as_str), Some("empório"));
        assert_eq!(dict.len(), CategoryDictionary::builtin().len());
    }

    #[test]
    fn merge_appends_new_ids_in_order() {
        let dict = CategoryDictionary::empty().merge(vec![
            CategoryDefinition::new("Trabalho", &["cowork"]),
            CategoryDefinition::new("Hobby", &["lego", " "]),
        ]);
        let names: Vec<_> = dict.categories().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Trabalho", "Hobby"]);
        assert_eq!(dict.get("hobby").unwrap().keywords, vec!["lego".to_string()]);
    }

    #[test]
    fn from_toml_reads_categories() {
        let toml = r##"
[[categories]]
id = "trabalho"
name = "Trabalho"
keywords = ["cowork", "wework"]

[[categories]]
id = "alimentacao"
name = "Alimentação"
color = "#00FF00"
keywords = ["empório"]
"##;
        let dict = CategoryDictionary::from_toml(toml).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("trabalho").unwrap().color, DEFAULT_COLOR);
        assert_eq!(dict.get("alimentacao").unwrap().color, "#00FF00");
    }

    #[test]
    fn from_toml_rejects_empty_name() {
        let toml = "[[categories]]\nid = \"x\"\nname = \" \"\n";
        assert!(matches!(
            CategoryDictionary::from_toml(toml),
            Err(CategoryError::EmptyName(id)) if id == "x"
        ));
    }

    #[test]
    fn color_of_falls_back_to_gray() {
        let dict = CategoryDictionary::builtin();
        assert_eq!(dict.color_of("Pets"), "#D32F2F");
        assert_eq!(dict.color_of("Desconhecida"), DEFAULT_COLOR);
    }
}
