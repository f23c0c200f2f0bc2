// src/relatorio_pdf.rs

use chrono::Local;
use genpdf::elements::{Break, FrameCellDecorator, LinearLayout, Paragraph, TableLayout};
use genpdf::style::Style;
use genpdf::{Alignment, Document, Element, SimplePageDecorator};

use crate::agendamentos::StatusAgendamento;
use crate::relatorio::LinhaRelatorio;

fn criar_estilos() -> (Style, Style, Style) {
    (
        Style::new().with_font_size(8),
        Style::new().bold().with_font_size(9),
        Style::new().bold().with_font_size(11),
    )
}

fn cabecalho_paroquia() -> Vec<impl Element> {
    vec![
        Paragraph::new("PARÓQUIA DE NOSSA SENHORA DA SAÚDE")
            .aligned(Alignment::Center)
            .styled(Style::new().bold().with_font_size(10)),
        Paragraph::new("PASTORAL DA SAÚDE - MINISTROS DA VISITA AOS DOENTES")
            .aligned(Alignment::Center)
            .styled(Style::new().bold().with_font_size(10)),
    ]
}

fn status_str(status: &StatusAgendamento) -> &'static str {
    match status {
        StatusAgendamento::Agendado => "Agendada",
        StatusAgendamento::Concluido => "Concluída",
        StatusAgendamento::Cancelado => "Cancelada",
    }
}

fn tabela_visitas(linhas: &[LinhaRelatorio], default_style: &Style, header_style: &Style) -> TableLayout {
    let mut table = TableLayout::new(vec![2, 1, 3, 2, 3, 2]);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));
    {
        let mut row = table.row();
        for titulo in ["Data", "Hora", "Doente", "Setor", "Ministros", "Estado"] {
            row.push_element(Paragraph::new(titulo).styled(header_style.clone()));
        }
        row.push().expect("header row");
    }
    for linha in linhas {
        let ministros = match &linha.nome_ministro_secundario {
            Some(secundario) => format!("{} e {}", linha.nome_ministro_primario, secundario),
            None => linha.nome_ministro_primario.clone(),
        };
        let mut row = table.row();
        row.push_element(
            Paragraph::new(linha.data.format("%d/%m/%Y").to_string()).styled(default_style.clone()),
        );
        row.push_element(
            Paragraph::new(linha.hora.as_deref().unwrap_or("---")).styled(default_style.clone()),
        );
        row.push_element(Paragraph::new(&linha.nome_doente).styled(default_style.clone()));
        row.push_element(Paragraph::new(&linha.setor).styled(default_style.clone()));
        row.push_element(Paragraph::new(ministros).styled(default_style.clone().italic()));
        row.push_element(Paragraph::new(status_str(&linha.status)).styled(default_style.clone()));
        row.push().expect("visita row");
    }
    table
}

/// Gera o PDF do relatório de visitas. As fontes Liberation Sans são lidas
/// do diretório `fonts/` ao lado do binário.
pub fn gerar_pdf_do_relatorio(
    linhas: &[LinhaRelatorio],
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let (default_style, header_style, title_style) = criar_estilos();

    let font_family = genpdf::fonts::from_files("fonts", "LiberationSans", None)?;
    let mut doc = Document::new(font_family);
    doc.set_title("Relatório de Visitas");
    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    let mut page_content = LinearLayout::vertical();
    for cab in cabecalho_paroquia() {
        page_content.push(cab);
        page_content.push(Break::new(0.1));
    }
    page_content.push(
        Paragraph::new("RELATÓRIO DE VISITAS")
            .aligned(Alignment::Center)
            .styled(title_style),
    );
    page_content.push(Break::new(0.5));

    if linhas.is_empty() {
        page_content.push(
            Paragraph::new("Sem visitas para os filtros escolhidos.")
                .aligned(Alignment::Center)
                .styled(default_style.clone()),
        );
    } else {
        page_content.push(tabela_visitas(linhas, &default_style, &header_style));
    }

    page_content.push(Break::new(1.0));
    let data_hoje = Local::now().format("%d/%m/%Y").to_string();
    page_content.push(
        Paragraph::new(format!("Documento gerado em {}", data_hoje))
            .aligned(Alignment::Center)
            .styled(default_style),
    );
    doc.push(page_content);

    let mut buf = Vec::new();
    doc.render(&mut buf)?;
    Ok(buf)
}
