use super::{CatalogEntry, Municipality};

const fn entry(code: &'static str, name: &'static str) -> CatalogEntry {
    CatalogEntry { code, name }
}

const fn municipality(
    department: &'static str,
    code: &'static str,
    name: &'static str,
) -> Municipality {
    Municipality { department, code, name }
}

pub(super) const DEPARTMENTS: &[CatalogEntry] = &[
    entry("01", "Ahuachapán"),
    entry("02", "Santa Ana"),
    entry("03", "Sonsonate"),
    entry("04", "Chalatenango"),
    entry("05", "La Libertad"),
    entry("06", "San Salvador"),
    entry("07", "Cuscatlán"),
    entry("08", "La Paz"),
    entry("09", "Cabañas"),
    entry("10", "San Vicente"),
    entry("11", "Usulután"),
    entry("12", "San Miguel"),
    entry("13", "Morazán"),
    entry("14", "La Unión"),
];

// Consolidated municipalities in force since May 2024.
pub(super) const MUNICIPALITIES: &[Municipality] = &[
    municipality("01", "13", "Ahuachapán Norte"),
    municipality("01", "14", "Ahuachapán Centro"),
    municipality("01", "15", "Ahuachapán Sur"),
    municipality("02", "14", "Santa Ana Norte"),
    municipality("02", "15", "Santa Ana Centro"),
    municipality("02", "16", "Santa Ana Este"),
    municipality("02", "17", "Santa Ana Oeste"),
    municipality("03", "17", "Sonsonate Norte"),
    municipality("03", "18", "Sonsonate Centro"),
    municipality("03", "19", "Sonsonate Este"),
    municipality("03", "20", "Sonsonate Oeste"),
    municipality("04", "34", "Chalatenango Norte"),
    municipality("04", "35", "Chalatenango Centro"),
    municipality("04", "36", "Chalatenango Sur"),
    municipality("05", "23", "La Libertad Norte"),
    municipality("05", "24", "La Libertad Centro"),
    municipality("05", "25", "La Libertad Oeste"),
    municipality("05", "26", "La Libertad Este"),
    municipality("05", "27", "La Libertad Costa"),
    municipality("05", "28", "La Libertad Sur"),
    municipality("06", "20", "San Salvador Norte"),
    municipality("06", "21", "San Salvador Oeste"),
    municipality("06", "22", "San Salvador Este"),
    municipality("06", "23", "San Salvador Centro"),
    municipality("06", "24", "San Salvador Sur"),
    municipality("07", "17", "Cuscatlán Norte"),
    municipality("07", "18", "Cuscatlán Sur"),
    municipality("08", "23", "La Paz Oeste"),
    municipality("08", "24", "La Paz Centro"),
    municipality("08", "25", "La Paz Este"),
    municipality("09", "10", "Cabañas Este"),
    municipality("09", "11", "Cabañas Oeste"),
    municipality("10", "14", "San Vicente Norte"),
    municipality("10", "15", "San Vicente Sur"),
    municipality("11", "24", "Usulután Norte"),
    municipality("11", "25", "Usulután Este"),
    municipality("11", "26", "Usulután Oeste"),
    municipality("12", "21", "San Miguel Norte"),
    municipality("12", "22", "San Miguel Centro"),
    municipality("12", "23", "San Miguel Oeste"),
    municipality("13", "27", "Morazán Norte"),
    municipality("13", "28", "Morazán Sur"),
    municipality("14", "19", "La Unión Norte"),
    municipality("14", "20", "La Unión Sur"),
];

pub(super) const IDENTITY_DOCUMENTS: &[CatalogEntry] = &[
    entry("36", "NIT"),
    entry("13", "DUI"),
    entry("37", "Otro"),
    entry("03", "Pasaporte"),
    entry("02", "Carné de residente"),
];

pub(super) const UNITS_OF_MEASURE: &[CatalogEntry] = &[
    entry("1", "Metro"),
    entry("23", "Litro"),
    entry("34", "Kilogramo"),
    entry("36", "Libra"),
    entry("57", "Ciento"),
    entry("58", "Docena"),
    entry("59", "Unidad"),
    entry("99", "Otra"),
];

pub(super) const PAYMENT_FORMS: &[CatalogEntry] = &[
    entry("01", "Billetes y monedas"),
    entry("02", "Tarjeta Débito"),
    entry("03", "Tarjeta Crédito"),
    entry("04", "Cheque"),
    entry("05", "Transferencia-Depósito Bancario"),
    entry("08", "Dinero electrónico"),
    entry("09", "Monedero electrónico"),
    entry("11", "Bitcoin"),
    entry("12", "Otras Criptomonedas"),
    entry("13", "Cuentas por pagar del receptor"),
    entry("14", "Giro bancario"),
    entry("99", "Otros"),
];

pub(super) const DTE_TYPES: &[CatalogEntry] = &[
    entry("01", "Factura"),
    entry("03", "Comprobante de crédito fiscal"),
    entry("04", "Nota de remisión"),
    entry("05", "Nota de crédito"),
    entry("06", "Nota de débito"),
    entry("07", "Comprobante de retención"),
    entry("08", "Comprobante de liquidación"),
    entry("09", "Documento contable de liquidación"),
    entry("11", "Factura de exportación"),
    entry("14", "Factura de sujeto excluido"),
    entry("15", "Comprobante de donación"),
];

pub(super) const ITEM_TYPES: &[CatalogEntry] = &[
    entry("1", "Bienes"),
    entry("2", "Servicios"),
    entry("3", "Ambos (Bienes y Servicios)"),
    entry("4", "Otros tributos por ítem"),
];

pub(super) const ECONOMIC_ACTIVITIES: &[CatalogEntry] = &[
    entry("01111", "Cultivo de cereales excepto arroz y para forrajes"),
    entry("10711", "Elaboración de productos de panadería"),
    entry("41001", "Construcción de edificios residenciales"),
    entry("45201", "Reparación mecánica de automotores"),
    entry("46900", "Venta al por mayor de otros productos"),
    entry("47111", "Venta en supermercados"),
    entry("47190", "Venta al por menor de otros productos en comercios no especializados"),
    entry("49232", "Transporte de carga por carretera"),
    entry("55101", "Actividades de alojamiento en hoteles"),
    entry("56101", "Restaurantes"),
    entry("62010", "Programación informática"),
    entry("62020", "Consultorías y gestión de servicios informáticos"),
    entry("69100", "Actividades jurídicas"),
    entry("69200", "Actividades de contabilidad, teneduría de libros y auditoría"),
    entry("70200", "Actividades de consultoría de gestión"),
    entry("73100", "Publicidad"),
    entry("85499", "Otros tipos de enseñanza n.c.p."),
    entry("86201", "Clínicas médicas"),
    entry("10001", "Empleados"),
    entry("10005", "Otros"),
];
